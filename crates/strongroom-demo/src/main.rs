//! Runs the full custody lifecycle against in-memory registries: an
//! authorized relayer deposits a token balance and an NFT for a depositor,
//! the depositor self-registers a recipient, the trusted authority rotates
//! it, and the new recipient withdraws both credits.
//!
//! `RUST_LOG=info cargo run -p strongroom-demo` shows the vault's view of
//! every step.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use strongroom_crypto::{authorize_rotation, KeyPair, PublicKey, RotationAuthorization};
use strongroom_registry::{
    FungibleRegistry, InMemoryFungibleRegistry, InMemoryNonFungibleRegistry, NonFungibleRegistry,
};
use strongroom_relay::{Relay, RelayConfig};
use strongroom_types::{Address, Amount, TokenId};
use strongroom_vault::{Vault, VaultConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Principals. The authority signs recipient rotations off-system; every
    // other actor is just an address.
    let authority = KeyPair::generate();
    let relayer = KeyPair::generate().address();
    let depositor = KeyPair::generate().address();
    let first_recipient = KeyPair::generate().address();
    let final_recipient = KeyPair::generate().address();
    let custody = Address::new([0xFF; 20]);
    let relay_addr = Address::new([0xA0; 20]);
    let controller = Address::new([0xC0; 20]);

    let fungibles = InMemoryFungibleRegistry::new();
    let non_fungibles = InMemoryNonFungibleRegistry::new();

    let vault = Vault::new(
        VaultConfig {
            address: custody,
            relay: relay_addr,
            authority: PublicKey::from_keypair(&authority),
            fee_controller: controller,
        },
        Arc::new(fungibles.clone()),
        Arc::new(non_fungibles.clone()),
    );
    let relay = Relay::new(
        RelayConfig {
            address: relay_addr,
            custody,
            controller,
        },
        vault.clone(),
        Arc::new(fungibles.clone()),
        Arc::new(non_fungibles.clone()),
    );
    relay.set_relayer(controller, relayer, true).await?;

    // The depositor holds a token balance and an NFT, both approved for the
    // relay to pull.
    let token = Address::new([0x30; 20]);
    let nft = Address::new([0x20; 20]);
    fungibles.mint(token, depositor, Amount::new(1_000)).await;
    fungibles
        .approve(token, depositor, relay_addr, Amount::new(1_000))
        .await;
    non_fungibles.mint(nft, depositor, TokenId::new(1)).await;
    non_fungibles
        .set_approval_for_all(nft, depositor, relay_addr, true)
        .await;

    relay
        .transfer_fungible(relayer, depositor, token, Amount::new(1_000), Amount::new(100))
        .await?;
    relay
        .transfer_non_fungible(relayer, depositor, nft, TokenId::new(1), Amount::new(50))
        .await?;

    vault.setup_recipient(depositor, first_recipient).await?;

    // The authority redirects custody rights with a 15-minute authorization.
    let expiry = Utc::now() + Duration::minutes(15);
    let message = RotationAuthorization {
        owner: depositor,
        new_recipient: final_recipient,
        expiry,
        vault: custody,
    };
    let signature = authorize_rotation(&authority, &message)?;
    vault
        .change_recipient(depositor, &signature, final_recipient, expiry)
        .await?;

    vault
        .withdraw_fungible(final_recipient, depositor, token, Amount::new(100))
        .await?;
    vault
        .withdraw_non_fungible(final_recipient, depositor, nft, TokenId::new(1), Amount::new(50))
        .await?;

    info!(
        recipient = %final_recipient,
        token_balance = %fungibles.balance_of(token, final_recipient).await,
        nft_owner = ?non_fungibles.owner_of(nft, TokenId::new(1)).await,
        accrued = %vault.accrued_payments().await,
        "custody lifecycle complete"
    );

    vault.withdraw_payments(controller, vault.accrued_payments().await).await?;

    Ok(())
}
