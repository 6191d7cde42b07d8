//! Strongroom Relay - the only path assets take into custody
//!
//! The relay gates deposits on an authorized-relayer set, performs the
//! external asset pull from the depositor into vault custody, and notifies
//! the vault of the resulting credit and fee.
//!
//! # Invariants
//!
//! 1. Only enabled relayers move assets; everyone else is rejected outright
//! 2. A single-item transfer is atomic: the asset moves and the credit is
//!    recorded, or neither happens
//! 3. Batch transfers are best-effort by design: each item succeeds or fails
//!    on its own and siblings proceed past a failed item

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strongroom_registry::{FungibleRegistry, NonFungibleRegistry};
use strongroom_types::{
    Address, Amount, FungibleDeposit, NonFungibleDeposit, Result, TokenId, VaultError,
};
use strongroom_vault::Vault;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Construction-time parameters of the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// The relay's own principal address; depositors approve it as spender
    /// or operator, and the vault accepts deposit notifications from it.
    pub address: Address,
    /// The vault custody address assets are pulled into.
    pub custody: Address,
    /// The only principal allowed to add or remove relayers, fixed at
    /// construction.
    pub controller: Address,
}

/// The Strongroom ingress gate.
#[derive(Clone)]
pub struct Relay {
    config: RelayConfig,
    vault: Vault,
    relayers: Arc<RwLock<HashMap<Address, bool>>>,
    fungibles: Arc<dyn FungibleRegistry>,
    non_fungibles: Arc<dyn NonFungibleRegistry>,
}

impl Relay {
    /// Create a relay in front of the given vault and registries.
    pub fn new(
        config: RelayConfig,
        vault: Vault,
        fungibles: Arc<dyn FungibleRegistry>,
        non_fungibles: Arc<dyn NonFungibleRegistry>,
    ) -> Self {
        Self {
            config,
            vault,
            relayers: Arc::new(RwLock::new(HashMap::new())),
            fungibles,
            non_fungibles,
        }
    }

    /// The relay's principal address.
    pub fn address(&self) -> Address {
        self.config.address
    }

    // ========================================================================
    // Relayer-set administration
    // ========================================================================

    /// Enable or disable a relayer. Controller only.
    pub async fn set_relayer(&self, caller: Address, relayer: Address, enabled: bool) -> Result<()> {
        if caller != self.config.controller {
            return Err(VaultError::Unauthorized { caller });
        }

        self.relayers.write().await.insert(relayer, enabled);
        info!(%relayer, enabled, "relayer set updated");
        Ok(())
    }

    /// Whether a principal is currently an enabled relayer.
    pub async fn is_relayer(&self, addr: Address) -> bool {
        self.relayers.read().await.get(&addr).copied().unwrap_or(false)
    }

    // ========================================================================
    // Single-item transfers
    // ========================================================================

    /// Pull `amount` of a fungible asset from the depositor into custody and
    /// credit the vault. Atomic: a rejected pull leaves no state change.
    pub async fn transfer_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<()> {
        self.require_relayer(caller).await?;
        self.pull_fungible(&FungibleDeposit {
            owner,
            asset,
            amount,
            fee,
        })
        .await
    }

    /// Pull a non-fungible item from the depositor into custody and credit
    /// the vault.
    pub async fn transfer_non_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        token_id: TokenId,
        fee: Amount,
    ) -> Result<()> {
        self.require_relayer(caller).await?;
        self.pull_non_fungible(&NonFungibleDeposit {
            owner,
            asset,
            token_id,
            fee,
        })
        .await
    }

    // ========================================================================
    // Batch transfers (best-effort)
    // ========================================================================

    /// Apply each fungible deposit independently. A failed item is skipped
    /// and its siblings proceed; the outcome vector is aligned with the
    /// input so callers can inspect which items failed.
    pub async fn batch_transfer_fungible(
        &self,
        caller: Address,
        items: &[FungibleDeposit],
    ) -> Result<Vec<Result<()>>> {
        self.require_relayer(caller).await?;

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self.pull_fungible(item).await;
            if let Err(err) = &outcome {
                warn!(owner = %item.owner, asset = %item.asset, code = err.error_code(), "batch item skipped");
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Apply each non-fungible deposit independently; same best-effort
    /// policy as the fungible batch.
    pub async fn batch_transfer_non_fungible(
        &self,
        caller: Address,
        items: &[NonFungibleDeposit],
    ) -> Result<Vec<Result<()>>> {
        self.require_relayer(caller).await?;

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self.pull_non_fungible(item).await;
            if let Err(err) = &outcome {
                warn!(owner = %item.owner, asset = %item.asset, token_id = %item.token_id, code = err.error_code(), "batch item skipped");
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn pull_fungible(&self, item: &FungibleDeposit) -> Result<()> {
        self.fungibles
            .transfer_from(
                item.asset,
                self.config.address,
                item.owner,
                self.config.custody,
                item.amount,
            )
            .await
            .map_err(|e| VaultError::TransferFailed {
                reason: e.to_string(),
            })?;

        self.vault
            .deposit_fungible(
                self.config.address,
                item.owner,
                item.asset,
                item.amount,
                item.fee,
            )
            .await?;

        info!(owner = %item.owner, asset = %item.asset, amount = %item.amount, fee = %item.fee, "fungible asset relayed into custody");
        Ok(())
    }

    async fn pull_non_fungible(&self, item: &NonFungibleDeposit) -> Result<()> {
        self.non_fungibles
            .transfer_from(
                item.asset,
                self.config.address,
                item.owner,
                self.config.custody,
                item.token_id,
            )
            .await
            .map_err(|e| VaultError::TransferFailed {
                reason: e.to_string(),
            })?;

        self.vault
            .deposit_non_fungible(
                self.config.address,
                item.owner,
                item.asset,
                item.token_id,
                item.fee,
            )
            .await?;

        info!(owner = %item.owner, asset = %item.asset, token_id = %item.token_id, fee = %item.fee, "non-fungible asset relayed into custody");
        Ok(())
    }

    async fn require_relayer(&self, caller: Address) -> Result<()> {
        if !self.is_relayer(caller).await {
            return Err(VaultError::Unauthorized { caller });
        }
        Ok(())
    }
}
