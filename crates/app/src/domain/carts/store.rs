//! Cart store contract and the Postgres-backed implementation.
//!
//! Both backends (this one and [`LocalCartStore`](super::local::LocalCartStore))
//! satisfy the same contract; which one a caller holds is decided solely by
//! the current authentication state, never mixed within a single cart.

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::carts::{
        errors::CartsServiceError,
        models::{CartLine, NewCartLine},
        repository::PgCartLinesRepository,
    },
};

/// The shared cart store contract.
#[automock]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Add a line, merging into an existing line for the same
    /// `(product, variant key)` by summing quantities.
    async fn add_line(&self, line: NewCartLine) -> Result<CartLine, CartsServiceError>;

    /// Remove a line. Idempotent: removing an unknown line is a no-op success.
    async fn remove_line(&self, uuid: Uuid) -> Result<(), CartsServiceError>;

    /// Set a line's quantity. A quantity of zero behaves as [`Self::remove_line`].
    async fn update_quantity(
        &self,
        uuid: Uuid,
        new_quantity: u32,
    ) -> Result<(), CartsServiceError>;

    /// Return the current authoritative snapshot. Always a real fetch, never
    /// silently stale.
    async fn list(&self) -> Result<Vec<CartLine>, CartsServiceError>;
}

/// Cart store backed by the durable remote line table, scoped to one
/// authenticated user.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    db: Db,
    user_uuid: Uuid,
    repository: PgCartLinesRepository,
}

impl PgCartStore {
    #[must_use]
    pub fn new(db: Db, user_uuid: Uuid) -> Self {
        Self {
            db,
            user_uuid,
            repository: PgCartLinesRepository::new(),
        }
    }

    /// The authenticated user this store is scoped to.
    pub fn user_uuid(&self) -> Uuid {
        self.user_uuid
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[tracing::instrument(
        name = "carts.store.add_line",
        skip(self, line),
        fields(user_uuid = %self.user_uuid, product_uuid = %line.product_uuid),
        err
    )]
    async fn add_line(&self, line: NewCartLine) -> Result<CartLine, CartsServiceError> {
        if line.quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let merged = self
            .repository
            .upsert_line(&mut tx, self.user_uuid, line)
            .await?;

        tx.commit().await?;

        Ok(merged)
    }

    #[tracing::instrument(
        name = "carts.store.remove_line",
        skip(self),
        fields(user_uuid = %self.user_uuid, line_uuid = %uuid),
        err
    )]
    async fn remove_line(&self, uuid: Uuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        // Removing a line that is already gone is a success, not an error.
        let _rows_affected = self
            .repository
            .delete_line(&mut tx, self.user_uuid, uuid)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.store.update_quantity",
        skip(self),
        fields(user_uuid = %self.user_uuid, line_uuid = %uuid, new_quantity),
        err
    )]
    async fn update_quantity(
        &self,
        uuid: Uuid,
        new_quantity: u32,
    ) -> Result<(), CartsServiceError> {
        if new_quantity == 0 {
            return self.remove_line(uuid).await;
        }

        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .update_quantity(&mut tx, self.user_uuid, uuid, new_quantity)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<CartLine>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let lines = self.repository.list_lines(&mut tx, self.user_uuid).await?;

        tx.commit().await?;

        Ok(lines)
    }
}
