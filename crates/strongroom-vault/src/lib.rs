//! Strongroom Vault - the custody ledger
//!
//! The vault owns all persisted custody state:
//! - per-owner per-asset credits and fees
//! - recipient bindings
//! - the consumed-authorization set
//! - the fee controller role and the accrued payment pool
//!
//! # Invariants
//!
//! 1. Credits are created only through the relay's deposit path
//! 2. A recipient binding self-registers at most once; afterwards it changes
//!    only via a signed, expiring, non-replayable authorization
//! 3. Every entry point completes fully or fails with no state change
//! 4. Fees never go negative; the payment pool never over-drains

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongroom_crypto::{verify_rotation, PublicKey, RotationAuthorization, Signature, Verification};
use strongroom_registry::{FungibleRegistry, NonFungibleRegistry};
use strongroom_types::{
    Address, Amount, FungibleCredit, NonFungibleCredit, RecipientBinding, Result, TokenId,
    VaultError,
};
use tokio::sync::RwLock;
use tracing::info;

/// Construction-time parameters of a vault deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault's own custody address; assets in custody are held here and
    /// rotation authorizations are bound to it.
    pub address: Address,
    /// The only principal allowed to notify deposits.
    pub relay: Address,
    /// Trusted off-system authority whose signature rotates recipients.
    pub authority: PublicKey,
    /// Initial fee controller.
    pub fee_controller: Address,
}

/// The Strongroom custody ledger.
///
/// A single globally-consistent state machine; all state lives behind
/// `RwLock`ed maps and every mutating call holds the guards it needs for its
/// full check-transfer-mutate sequence.
#[derive(Clone)]
pub struct Vault {
    config: VaultConfig,
    fungible_credits: Arc<RwLock<HashMap<(Address, Address), FungibleCredit>>>,
    non_fungible_credits: Arc<RwLock<HashMap<(Address, Address, TokenId), NonFungibleCredit>>>,
    bindings: Arc<RwLock<HashMap<Address, RecipientBinding>>>,
    consumed: Arc<RwLock<HashSet<[u8; 32]>>>,
    fee_controller: Arc<RwLock<Address>>,
    pool: Arc<RwLock<Amount>>,
    fungibles: Arc<dyn FungibleRegistry>,
    non_fungibles: Arc<dyn NonFungibleRegistry>,
}

impl Vault {
    /// Create a vault over the given external registries.
    pub fn new(
        config: VaultConfig,
        fungibles: Arc<dyn FungibleRegistry>,
        non_fungibles: Arc<dyn NonFungibleRegistry>,
    ) -> Self {
        let fee_controller = config.fee_controller;
        Self {
            config,
            fungible_credits: Arc::new(RwLock::new(HashMap::new())),
            non_fungible_credits: Arc::new(RwLock::new(HashMap::new())),
            bindings: Arc::new(RwLock::new(HashMap::new())),
            consumed: Arc::new(RwLock::new(HashSet::new())),
            fee_controller: Arc::new(RwLock::new(fee_controller)),
            pool: Arc::new(RwLock::new(Amount::zero())),
            fungibles,
            non_fungibles,
        }
    }

    /// The vault's custody address.
    pub fn address(&self) -> Address {
        self.config.address
    }

    // ========================================================================
    // Deposit notification (relay only)
    // ========================================================================

    /// Record a fungible credit after the relay moved `amount` into custody.
    ///
    /// Repeated deposits accumulate both the withdrawable amount and the fee.
    pub async fn deposit_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<()> {
        self.require_relay(caller)?;

        let mut credits = self.fungible_credits.write().await;
        let current = credits
            .get(&(owner, asset))
            .copied()
            .unwrap_or_default();
        let next = FungibleCredit {
            amount: current.amount.checked_add(amount)?,
            fee: current.fee.checked_add(fee)?,
        };
        credits.insert((owner, asset), next);

        info!(%owner, %asset, %amount, %fee, "fungible deposit credited");
        Ok(())
    }

    /// Record a non-fungible credit after the relay moved the item into
    /// custody.
    pub async fn deposit_non_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        token_id: TokenId,
        fee: Amount,
    ) -> Result<()> {
        self.require_relay(caller)?;

        let mut credits = self.non_fungible_credits.write().await;
        let current = credits
            .get(&(owner, asset, token_id))
            .copied()
            .unwrap_or_default();
        let next = NonFungibleCredit {
            withdrawable: true,
            fee: current.fee.checked_add(fee)?,
        };
        credits.insert((owner, asset, token_id), next);

        info!(%owner, %asset, %token_id, %fee, "non-fungible deposit credited");
        Ok(())
    }

    // ========================================================================
    // Recipient binding
    // ========================================================================

    /// One-time self-registration of a recipient by the owner.
    ///
    /// Fails with `AlreadyRegistered` once a binding exists through either
    /// path - self-registration or signed rotation.
    pub async fn setup_recipient(&self, caller: Address, recipient: Address) -> Result<()> {
        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&caller) {
            return Err(VaultError::AlreadyRegistered { owner: caller });
        }

        bindings.insert(
            caller,
            RecipientBinding {
                recipient,
                self_registered: true,
            },
        );

        info!(owner = %caller, %recipient, "recipient self-registered");
        Ok(())
    }

    /// Rotate the caller's recipient binding with an authorization signed by
    /// the trusted authority.
    ///
    /// The signature, expiry, and replay checks must all hold; nothing is
    /// written until they do.
    pub async fn change_recipient(
        &self,
        caller: Address,
        signature: &Signature,
        new_recipient: Address,
        expiry: DateTime<Utc>,
    ) -> Result<()> {
        let message = RotationAuthorization {
            owner: caller,
            new_recipient,
            expiry,
            vault: self.config.address,
        };

        match verify_rotation(signature, &message) {
            Verification::Verified(identity) if identity == self.config.authority => {}
            _ => return Err(VaultError::InvalidSignature),
        }

        if expiry <= Utc::now() {
            return Err(VaultError::Expired { expiry });
        }

        let mut consumed = self.consumed.write().await;
        if !consumed.insert(message.digest()) {
            return Err(VaultError::Replayed);
        }

        let mut bindings = self.bindings.write().await;
        bindings
            .entry(caller)
            .and_modify(|binding| binding.recipient = new_recipient)
            .or_insert(RecipientBinding {
                recipient: new_recipient,
                self_registered: false,
            });

        info!(owner = %caller, recipient = %new_recipient, %expiry, "recipient rotated");
        Ok(())
    }

    /// The recipient currently bound for an owner, if any.
    pub async fn recipient_of(&self, owner: Address) -> Option<Address> {
        self.bindings.read().await.get(&owner).map(|b| b.recipient)
    }

    // ========================================================================
    // Withdrawal (bound recipient only)
    // ========================================================================

    /// Release an owner's full fungible credit to the bound recipient.
    ///
    /// `payment` must cover the recorded fee; any excess is retained. The
    /// credit clears atomically with the asset leaving custody.
    pub async fn withdraw_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        payment: Amount,
    ) -> Result<()> {
        self.require_recipient(caller, owner).await?;

        let mut credits = self.fungible_credits.write().await;
        let credit = credits
            .get(&(owner, asset))
            .copied()
            .filter(|c| !c.amount.is_zero())
            .ok_or(VaultError::NothingToWithdraw)?;

        if payment < credit.fee {
            return Err(VaultError::InsufficientFee {
                payment,
                fee: credit.fee,
            });
        }

        let mut pool = self.pool.write().await;
        let next_pool = pool.checked_add(payment)?;

        self.fungibles
            .transfer(asset, self.config.address, caller, credit.amount)
            .await
            .map_err(|e| VaultError::TransferFailed {
                reason: e.to_string(),
            })?;

        credits.remove(&(owner, asset));
        *pool = next_pool;

        info!(%owner, %asset, recipient = %caller, amount = %credit.amount, %payment, "fungible credit withdrawn");
        Ok(())
    }

    /// Release a non-fungible item to the bound recipient.
    pub async fn withdraw_non_fungible(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        token_id: TokenId,
        payment: Amount,
    ) -> Result<()> {
        self.require_recipient(caller, owner).await?;

        let mut credits = self.non_fungible_credits.write().await;
        let credit = credits
            .get(&(owner, asset, token_id))
            .copied()
            .filter(|c| c.withdrawable)
            .ok_or(VaultError::NothingToWithdraw)?;

        if payment < credit.fee {
            return Err(VaultError::InsufficientFee {
                payment,
                fee: credit.fee,
            });
        }

        let mut pool = self.pool.write().await;
        let next_pool = pool.checked_add(payment)?;

        self.non_fungibles
            .transfer_from(asset, self.config.address, self.config.address, caller, token_id)
            .await
            .map_err(|e| VaultError::TransferFailed {
                reason: e.to_string(),
            })?;

        credits.remove(&(owner, asset, token_id));
        *pool = next_pool;

        info!(%owner, %asset, %token_id, recipient = %caller, %payment, "non-fungible credit withdrawn");
        Ok(())
    }

    /// Withdrawable fungible amount for (owner, asset).
    pub async fn can_withdraw_fungible(&self, owner: Address, asset: Address) -> Amount {
        self.fungible_credits
            .read()
            .await
            .get(&(owner, asset))
            .map(|c| c.amount)
            .unwrap_or(Amount::zero())
    }

    /// Whether a non-fungible item is currently withdrawable.
    pub async fn can_withdraw_non_fungible(
        &self,
        owner: Address,
        asset: Address,
        token_id: TokenId,
    ) -> bool {
        self.non_fungible_credits
            .read()
            .await
            .get(&(owner, asset, token_id))
            .map(|c| c.withdrawable)
            .unwrap_or(false)
    }

    /// Recorded release fee for a fungible credit.
    pub async fn fungible_fee(&self, owner: Address, asset: Address) -> Amount {
        self.fungible_credits
            .read()
            .await
            .get(&(owner, asset))
            .map(|c| c.fee)
            .unwrap_or(Amount::zero())
    }

    /// Recorded release fee for a non-fungible credit.
    pub async fn non_fungible_fee(
        &self,
        owner: Address,
        asset: Address,
        token_id: TokenId,
    ) -> Amount {
        self.non_fungible_credits
            .read()
            .await
            .get(&(owner, asset, token_id))
            .map(|c| c.fee)
            .unwrap_or(Amount::zero())
    }

    // ========================================================================
    // Fee administration (fee controller only)
    // ========================================================================

    /// Reduce the recorded fee on a fungible credit. The fee may reach zero
    /// but never goes negative.
    pub async fn reduce_fungible_fee(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        amount: Amount,
    ) -> Result<()> {
        self.require_fee_controller(caller).await?;

        let mut credits = self.fungible_credits.write().await;
        reduce_fee(credits.get_mut(&(owner, asset)).map(|c| &mut c.fee), amount)?;

        info!(%owner, %asset, reduction = %amount, "fungible fee reduced");
        Ok(())
    }

    /// Reduce the recorded fee on a non-fungible credit.
    pub async fn reduce_non_fungible_fee(
        &self,
        caller: Address,
        owner: Address,
        asset: Address,
        token_id: TokenId,
        amount: Amount,
    ) -> Result<()> {
        self.require_fee_controller(caller).await?;

        let mut credits = self.non_fungible_credits.write().await;
        reduce_fee(
            credits.get_mut(&(owner, asset, token_id)).map(|c| &mut c.fee),
            amount,
        )?;

        info!(%owner, %asset, %token_id, reduction = %amount, "non-fungible fee reduced");
        Ok(())
    }

    /// Hand the fee-controller role to a new principal.
    pub async fn change_fee_controller(&self, caller: Address, new_controller: Address) -> Result<()> {
        let mut controller = self.fee_controller.write().await;
        if caller != *controller {
            return Err(VaultError::Unauthorized { caller });
        }
        *controller = new_controller;

        info!(%caller, %new_controller, "fee controller rotated");
        Ok(())
    }

    /// Extract `amount` from the accrued payment pool.
    pub async fn withdraw_payments(&self, caller: Address, amount: Amount) -> Result<()> {
        self.require_fee_controller(caller).await?;

        let mut pool = self.pool.write().await;
        let remaining = pool
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientPool {
                requested: amount,
                pool: *pool,
            })?;
        *pool = remaining;

        info!(controller = %caller, %amount, "accrued payments withdrawn");
        Ok(())
    }

    /// The current fee controller.
    pub async fn fee_controller(&self) -> Address {
        *self.fee_controller.read().await
    }

    /// Retained withdrawal payments not yet extracted.
    pub async fn accrued_payments(&self) -> Amount {
        *self.pool.read().await
    }

    // ========================================================================
    // Access checks
    // ========================================================================

    fn require_relay(&self, caller: Address) -> Result<()> {
        if caller != self.config.relay {
            return Err(VaultError::Unauthorized { caller });
        }
        Ok(())
    }

    async fn require_fee_controller(&self, caller: Address) -> Result<()> {
        if caller != *self.fee_controller.read().await {
            return Err(VaultError::Unauthorized { caller });
        }
        Ok(())
    }

    async fn require_recipient(&self, caller: Address, owner: Address) -> Result<()> {
        let bound = self.recipient_of(owner).await;
        if bound != Some(caller) {
            return Err(VaultError::NotRecipient { caller, owner });
        }
        Ok(())
    }
}

/// Shared fee-reduction rule: an absent credit carries a zero fee, so any
/// nonzero reduction on it underflows.
fn reduce_fee(fee: Option<&mut Amount>, reduction: Amount) -> Result<()> {
    match fee {
        Some(fee) => {
            *fee = fee
                .checked_sub(reduction)
                .ok_or(VaultError::FeeUnderflow {
                    requested: reduction,
                    fee: *fee,
                })?;
            Ok(())
        }
        None if reduction.is_zero() => Ok(()),
        None => Err(VaultError::FeeUnderflow {
            requested: reduction,
            fee: Amount::zero(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use strongroom_crypto::{authorize_rotation, KeyPair};
    use strongroom_registry::{InMemoryFungibleRegistry, InMemoryNonFungibleRegistry};

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    const RELAY: u8 = 0xA0;
    const CONTROLLER: u8 = 0xB0;

    struct Fixture {
        vault: Vault,
        fungibles: InMemoryFungibleRegistry,
        non_fungibles: InMemoryNonFungibleRegistry,
        authority: KeyPair,
    }

    fn fixture() -> Fixture {
        let fungibles = InMemoryFungibleRegistry::new();
        let non_fungibles = InMemoryNonFungibleRegistry::new();
        let authority = KeyPair::generate();
        let vault = Vault::new(
            VaultConfig {
                address: addr(0xFF),
                relay: addr(RELAY),
                authority: PublicKey::from_keypair(&authority),
                fee_controller: addr(CONTROLLER),
            },
            Arc::new(fungibles.clone()),
            Arc::new(non_fungibles.clone()),
        );
        Fixture {
            vault,
            fungibles,
            non_fungibles,
            authority,
        }
    }

    /// Deposit helper that also places the asset in custody, as the relay
    /// would have.
    async fn deposit_fungible(fx: &Fixture, owner: Address, asset: Address, amount: u128, fee: u128) {
        fx.fungibles
            .mint(asset, fx.vault.address(), Amount::new(amount))
            .await;
        fx.vault
            .deposit_fungible(
                addr(RELAY),
                owner,
                asset,
                Amount::new(amount),
                Amount::new(fee),
            )
            .await
            .unwrap();
    }

    async fn deposit_non_fungible(fx: &Fixture, owner: Address, asset: Address, id: u64, fee: u128) {
        fx.non_fungibles
            .mint(asset, fx.vault.address(), TokenId::new(id))
            .await;
        fx.vault
            .deposit_non_fungible(addr(RELAY), owner, asset, TokenId::new(id), Amount::new(fee))
            .await
            .unwrap();
    }

    fn rotation(
        fx: &Fixture,
        owner: Address,
        new_recipient: Address,
        expiry: DateTime<Utc>,
    ) -> Signature {
        let message = RotationAuthorization {
            owner,
            new_recipient,
            expiry,
            vault: fx.vault.address(),
        };
        authorize_rotation(&fx.authority, &message).unwrap()
    }

    #[tokio::test]
    async fn test_deposit_requires_relay() {
        let fx = fixture();
        let denied = fx
            .vault
            .deposit_fungible(addr(1), addr(2), addr(3), Amount::new(10), Amount::new(1))
            .await;
        assert!(matches!(denied, Err(VaultError::Unauthorized { .. })));
        assert_eq!(
            fx.vault.can_withdraw_fungible(addr(2), addr(3)).await,
            Amount::zero()
        );
    }

    #[tokio::test]
    async fn test_fungible_deposits_accumulate() {
        let fx = fixture();
        let (owner, asset) = (addr(1), addr(2));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;
        deposit_fungible(&fx, owner, asset, 500, 50).await;

        assert_eq!(
            fx.vault.can_withdraw_fungible(owner, asset).await,
            Amount::new(1500)
        );
        assert_eq!(fx.vault.fungible_fee(owner, asset).await, Amount::new(150));
    }

    #[tokio::test]
    async fn test_setup_recipient_only_once() {
        let fx = fixture();
        let owner = addr(1);
        fx.vault.setup_recipient(owner, addr(2)).await.unwrap();
        assert_eq!(fx.vault.recipient_of(owner).await, Some(addr(2)));

        let again = fx.vault.setup_recipient(owner, addr(3)).await;
        assert!(matches!(again, Err(VaultError::AlreadyRegistered { .. })));
        assert_eq!(fx.vault.recipient_of(owner).await, Some(addr(2)));
    }

    #[tokio::test]
    async fn test_rotation_happy_path() {
        let fx = fixture();
        let owner = addr(1);
        fx.vault.setup_recipient(owner, addr(2)).await.unwrap();

        let expiry = Utc::now() + Duration::minutes(15);
        let sig = rotation(&fx, owner, addr(3), expiry);
        fx.vault
            .change_recipient(owner, &sig, addr(3), expiry)
            .await
            .unwrap();

        assert_eq!(fx.vault.recipient_of(owner).await, Some(addr(3)));
    }

    #[tokio::test]
    async fn test_rotation_binds_unregistered_owner_and_blocks_setup() {
        let fx = fixture();
        let owner = addr(1);

        let expiry = Utc::now() + Duration::minutes(15);
        let sig = rotation(&fx, owner, addr(3), expiry);
        fx.vault
            .change_recipient(owner, &sig, addr(3), expiry)
            .await
            .unwrap();
        assert_eq!(fx.vault.recipient_of(owner).await, Some(addr(3)));

        let late_setup = fx.vault.setup_recipient(owner, addr(4)).await;
        assert!(matches!(
            late_setup,
            Err(VaultError::AlreadyRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn test_rotation_replay_rejected() {
        let fx = fixture();
        let owner = addr(1);

        let expiry = Utc::now() + Duration::minutes(15);
        let sig = rotation(&fx, owner, addr(3), expiry);
        fx.vault
            .change_recipient(owner, &sig, addr(3), expiry)
            .await
            .unwrap();

        let replay = fx.vault.change_recipient(owner, &sig, addr(3), expiry).await;
        assert_eq!(replay, Err(VaultError::Replayed));
    }

    #[tokio::test]
    async fn test_rotation_expired_rejected() {
        let fx = fixture();
        let owner = addr(1);

        let expiry = Utc::now() - Duration::seconds(1);
        let sig = rotation(&fx, owner, addr(3), expiry);
        let expired = fx.vault.change_recipient(owner, &sig, addr(3), expiry).await;

        assert!(matches!(expired, Err(VaultError::Expired { .. })));
        assert_eq!(fx.vault.recipient_of(owner).await, None);
    }

    #[tokio::test]
    async fn test_rotation_rejects_untrusted_signer() {
        let fx = fixture();
        let owner = addr(1);
        let expiry = Utc::now() + Duration::minutes(15);

        let impostor = KeyPair::generate();
        let message = RotationAuthorization {
            owner,
            new_recipient: addr(3),
            expiry,
            vault: fx.vault.address(),
        };
        let sig = authorize_rotation(&impostor, &message).unwrap();

        let denied = fx.vault.change_recipient(owner, &sig, addr(3), expiry).await;
        assert_eq!(denied, Err(VaultError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_rotation_rejects_signature_for_other_vault() {
        let fx = fixture();
        let owner = addr(1);
        let expiry = Utc::now() + Duration::minutes(15);

        let message = RotationAuthorization {
            owner,
            new_recipient: addr(3),
            expiry,
            vault: addr(0xEE), // not this deployment
        };
        let sig = authorize_rotation(&fx.authority, &message).unwrap();

        let denied = fx.vault.change_recipient(owner, &sig, addr(3), expiry).await;
        assert_eq!(denied, Err(VaultError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_distinct_recipients_may_share_expiry() {
        let fx = fixture();
        let owner = addr(1);
        let expiry = Utc::now() + Duration::minutes(15);

        let first = rotation(&fx, owner, addr(3), expiry);
        fx.vault
            .change_recipient(owner, &first, addr(3), expiry)
            .await
            .unwrap();

        // Full-digest replay keying: a different recipient under the same
        // expiry is a distinct authorization.
        let second = rotation(&fx, owner, addr(4), expiry);
        fx.vault
            .change_recipient(owner, &second, addr(4), expiry)
            .await
            .unwrap();
        assert_eq!(fx.vault.recipient_of(owner).await, Some(addr(4)));
    }

    #[tokio::test]
    async fn test_withdraw_requires_bound_recipient() {
        let fx = fixture();
        let (owner, asset) = (addr(1), addr(2));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;

        // No binding yet: nobody can withdraw.
        let denied = fx
            .vault
            .withdraw_fungible(addr(9), owner, asset, Amount::new(100))
            .await;
        assert!(matches!(denied, Err(VaultError::NotRecipient { .. })));

        fx.vault.setup_recipient(owner, addr(5)).await.unwrap();
        let still_denied = fx
            .vault
            .withdraw_fungible(addr(9), owner, asset, Amount::new(100))
            .await;
        assert!(matches!(still_denied, Err(VaultError::NotRecipient { .. })));
    }

    #[tokio::test]
    async fn test_fungible_withdrawal_clears_credit() {
        let fx = fixture();
        let (owner, asset, recipient) = (addr(1), addr(2), addr(5));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;
        fx.vault.setup_recipient(owner, recipient).await.unwrap();

        let underpaid = fx
            .vault
            .withdraw_fungible(recipient, owner, asset, Amount::new(99))
            .await;
        assert!(matches!(underpaid, Err(VaultError::InsufficientFee { .. })));

        fx.vault
            .withdraw_fungible(recipient, owner, asset, Amount::new(100))
            .await
            .unwrap();

        assert_eq!(
            fx.fungibles.balance_of(asset, recipient).await,
            Amount::new(1000)
        );
        assert_eq!(
            fx.vault.can_withdraw_fungible(owner, asset).await,
            Amount::zero()
        );

        let again = fx
            .vault
            .withdraw_fungible(recipient, owner, asset, Amount::new(100))
            .await;
        assert_eq!(again, Err(VaultError::NothingToWithdraw));
    }

    #[tokio::test]
    async fn test_overpayment_is_retained() {
        let fx = fixture();
        let (owner, asset, recipient) = (addr(1), addr(2), addr(5));
        deposit_non_fungible(&fx, owner, asset, 1, 100).await;
        fx.vault.setup_recipient(owner, recipient).await.unwrap();

        fx.vault
            .withdraw_non_fungible(recipient, owner, asset, TokenId::new(1), Amount::new(140))
            .await
            .unwrap();

        assert_eq!(
            fx.non_fungibles.owner_of(asset, TokenId::new(1)).await,
            Some(recipient)
        );
        assert!(
            !fx.vault
                .can_withdraw_non_fungible(owner, asset, TokenId::new(1))
                .await
        );
        assert_eq!(fx.vault.accrued_payments().await, Amount::new(140));
    }

    #[tokio::test]
    async fn test_rejected_release_leaves_credit_live() {
        let fx = fixture();
        let (owner, asset, recipient) = (addr(1), addr(2), addr(5));

        // Credit recorded but nothing placed in custody: the external push
        // is rejected and no state may change.
        fx.vault
            .deposit_fungible(addr(RELAY), owner, asset, Amount::new(1000), Amount::new(100))
            .await
            .unwrap();
        fx.vault.setup_recipient(owner, recipient).await.unwrap();

        let failed = fx
            .vault
            .withdraw_fungible(recipient, owner, asset, Amount::new(100))
            .await;
        assert!(matches!(failed, Err(VaultError::TransferFailed { .. })));
        assert_eq!(
            fx.vault.can_withdraw_fungible(owner, asset).await,
            Amount::new(1000)
        );
        assert_eq!(fx.vault.accrued_payments().await, Amount::zero());
    }

    #[tokio::test]
    async fn test_fee_reduction_bounds() {
        let fx = fixture();
        let (owner, asset) = (addr(1), addr(2));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;
        deposit_non_fungible(&fx, owner, asset, 4, 100).await;

        let stranger = fx
            .vault
            .reduce_fungible_fee(addr(9), owner, asset, Amount::new(10))
            .await;
        assert!(matches!(stranger, Err(VaultError::Unauthorized { .. })));

        let too_much = fx
            .vault
            .reduce_fungible_fee(addr(CONTROLLER), owner, asset, Amount::new(101))
            .await;
        assert!(matches!(too_much, Err(VaultError::FeeUnderflow { .. })));

        fx.vault
            .reduce_fungible_fee(addr(CONTROLLER), owner, asset, Amount::new(100))
            .await
            .unwrap();
        assert_eq!(fx.vault.fungible_fee(owner, asset).await, Amount::zero());

        fx.vault
            .reduce_non_fungible_fee(addr(CONTROLLER), owner, asset, TokenId::new(4), Amount::new(100))
            .await
            .unwrap();
        assert_eq!(
            fx.vault.non_fungible_fee(owner, asset, TokenId::new(4)).await,
            Amount::zero()
        );
    }

    #[tokio::test]
    async fn test_fee_controller_handoff() {
        let fx = fixture();
        let (owner, asset) = (addr(1), addr(2));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;

        fx.vault
            .change_fee_controller(addr(CONTROLLER), addr(0xB1))
            .await
            .unwrap();
        assert_eq!(fx.vault.fee_controller().await, addr(0xB1));

        let old = fx
            .vault
            .reduce_fungible_fee(addr(CONTROLLER), owner, asset, Amount::new(10))
            .await;
        assert!(matches!(old, Err(VaultError::Unauthorized { .. })));

        fx.vault
            .reduce_fungible_fee(addr(0xB1), owner, asset, Amount::new(10))
            .await
            .unwrap();
        assert_eq!(fx.vault.fungible_fee(owner, asset).await, Amount::new(90));
    }

    #[tokio::test]
    async fn test_payment_pool_is_bounded() {
        let fx = fixture();
        let (owner, asset, recipient) = (addr(1), addr(2), addr(5));
        deposit_fungible(&fx, owner, asset, 1000, 100).await;
        fx.vault.setup_recipient(owner, recipient).await.unwrap();
        fx.vault
            .withdraw_fungible(recipient, owner, asset, Amount::new(100))
            .await
            .unwrap();

        let over = fx
            .vault
            .withdraw_payments(addr(CONTROLLER), Amount::new(101))
            .await;
        assert!(matches!(over, Err(VaultError::InsufficientPool { .. })));

        fx.vault
            .withdraw_payments(addr(CONTROLLER), Amount::new(100))
            .await
            .unwrap();
        assert_eq!(fx.vault.accrued_payments().await, Amount::zero());
    }
}
