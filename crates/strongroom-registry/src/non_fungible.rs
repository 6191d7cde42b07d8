//! Non-fungible asset registry seam

use crate::{RegistryError, RegistryResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strongroom_types::{Address, TokenId};
use tokio::sync::RwLock;
use tracing::debug;

/// External non-fungible asset registry.
///
/// Exposes ownership queries and transfer-on-behalf-of by item identifier,
/// gated on operator approval.
#[async_trait::async_trait]
pub trait NonFungibleRegistry: Send + Sync {
    /// Current owner of a token, if it exists.
    async fn owner_of(&self, asset: Address, token_id: TokenId) -> Option<Address>;

    /// Owner grants or revokes an operator over all their tokens of `asset`.
    async fn set_approval_for_all(
        &self,
        asset: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    );

    /// Whether an operator may move the owner's tokens of `asset`.
    async fn is_approved_for_all(&self, asset: Address, owner: Address, operator: Address) -> bool;

    /// Move `token_id` from `from` to `to` on behalf of `operator`.
    /// Rejected unless `from` owns the token and `operator` is `from` or an
    /// approved operator.
    async fn transfer_from(
        &self,
        asset: Address,
        operator: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> RegistryResult<()>;
}

/// In-memory non-fungible registry with real ownership/approval preconditions.
#[derive(Clone, Default)]
pub struct InMemoryNonFungibleRegistry {
    owners: Arc<RwLock<HashMap<(Address, TokenId), Address>>>,
    operators: Arc<RwLock<HashSet<(Address, Address, Address)>>>,
}

impl InMemoryNonFungibleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token. Test/demo setup only.
    pub async fn mint(&self, asset: Address, to: Address, token_id: TokenId) {
        self.owners.write().await.insert((asset, token_id), to);
    }
}

#[async_trait::async_trait]
impl NonFungibleRegistry for InMemoryNonFungibleRegistry {
    async fn owner_of(&self, asset: Address, token_id: TokenId) -> Option<Address> {
        self.owners.read().await.get(&(asset, token_id)).copied()
    }

    async fn set_approval_for_all(
        &self,
        asset: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    ) {
        let mut operators = self.operators.write().await;
        if approved {
            operators.insert((asset, owner, operator));
        } else {
            operators.remove(&(asset, owner, operator));
        }
    }

    async fn is_approved_for_all(&self, asset: Address, owner: Address, operator: Address) -> bool {
        self.operators
            .read()
            .await
            .contains(&(asset, owner, operator))
    }

    async fn transfer_from(
        &self,
        asset: Address,
        operator: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> RegistryResult<()> {
        let mut owners = self.owners.write().await;
        let holder = owners.get(&(asset, token_id)).copied();
        if holder != Some(from) {
            return Err(RegistryError::NotOwner {
                asset,
                token_id,
                claimed: from,
            });
        }

        if operator != from && !self.is_approved_for_all(asset, from, operator).await {
            return Err(RegistryError::NotApproved {
                owner: from,
                operator,
            });
        }

        owners.insert((asset, token_id), to);
        debug!(%asset, %token_id, %from, %to, "non-fungible item moved");
        Ok(())
    }
}
