//! Fungible asset registry seam

use crate::{RegistryError, RegistryResult};
use std::collections::HashMap;
use std::sync::Arc;
use strongroom_types::{Address, Amount};
use tokio::sync::RwLock;
use tracing::debug;

/// External fungible asset registry.
///
/// Exposes pull-from-approved-owner and direct-owner transfer semantics.
/// `asset` names the token contract a call operates on; balances and
/// allowances are scoped to it.
#[async_trait::async_trait]
pub trait FungibleRegistry: Send + Sync {
    /// Current balance of a holder.
    async fn balance_of(&self, asset: Address, holder: Address) -> Amount;

    /// Remaining amount a spender may pull from an owner.
    async fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Amount;

    /// Owner grants a spender the right to pull up to `amount`.
    async fn approve(&self, asset: Address, owner: Address, spender: Address, amount: Amount);

    /// Pull `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. Rejected unless the allowance and balance both cover it.
    async fn transfer_from(
        &self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> RegistryResult<()>;

    /// Move `amount` out of `from`'s own balance.
    async fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> RegistryResult<()>;
}

/// In-memory fungible registry with real balance/allowance preconditions.
#[derive(Clone, Default)]
pub struct InMemoryFungibleRegistry {
    balances: Arc<RwLock<HashMap<(Address, Address), Amount>>>,
    allowances: Arc<RwLock<HashMap<(Address, Address, Address), Amount>>>,
}

impl InMemoryFungibleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance. Test/demo setup only; real registries mint elsewhere.
    pub async fn mint(&self, asset: Address, to: Address, amount: Amount) {
        let mut balances = self.balances.write().await;
        let entry = balances.entry((asset, to)).or_insert(Amount::zero());
        entry.0 += amount.0;
    }

    async fn move_balance(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> RegistryResult<()> {
        let mut balances = self.balances.write().await;
        let available = balances
            .get(&(asset, from))
            .copied()
            .unwrap_or(Amount::zero());
        let remaining = available
            .checked_sub(amount)
            .ok_or(RegistryError::InsufficientBalance {
                holder: from,
                available,
                required: amount,
            })?;

        balances.insert((asset, from), remaining);
        let entry = balances.entry((asset, to)).or_insert(Amount::zero());
        entry.0 += amount.0;

        debug!(%asset, %from, %to, %amount, "fungible balance moved");
        Ok(())
    }
}

#[async_trait::async_trait]
impl FungibleRegistry for InMemoryFungibleRegistry {
    async fn balance_of(&self, asset: Address, holder: Address) -> Amount {
        self.balances
            .read()
            .await
            .get(&(asset, holder))
            .copied()
            .unwrap_or(Amount::zero())
    }

    async fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Amount {
        self.allowances
            .read()
            .await
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(Amount::zero())
    }

    async fn approve(&self, asset: Address, owner: Address, spender: Address, amount: Amount) {
        self.allowances
            .write()
            .await
            .insert((asset, owner, spender), amount);
    }

    async fn transfer_from(
        &self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> RegistryResult<()> {
        {
            let mut allowances = self.allowances.write().await;
            let available = allowances
                .get(&(asset, from, spender))
                .copied()
                .unwrap_or(Amount::zero());
            let remaining =
                available
                    .checked_sub(amount)
                    .ok_or(RegistryError::InsufficientAllowance {
                        spender,
                        available,
                        required: amount,
                    })?;
            allowances.insert((asset, from, spender), remaining);
        }

        match self.move_balance(asset, from, to, amount).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // Restore the allowance; a rejected move must not consume it.
                let mut allowances = self.allowances.write().await;
                let entry = allowances
                    .entry((asset, from, spender))
                    .or_insert(Amount::zero());
                entry.0 += amount.0;
                Err(err)
            }
        }
    }

    async fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.move_balance(asset, from, to, amount).await
    }
}
