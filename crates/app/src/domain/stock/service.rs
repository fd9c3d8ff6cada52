//! Stock service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::stock::{errors::StockServiceError, repository::PgStockRepository},
};

#[derive(Debug, Clone)]
pub struct PgStockService {
    db: Db,
    repository: PgStockRepository,
}

impl PgStockService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgStockRepository::new(),
        }
    }
}

#[async_trait]
impl StockService for PgStockService {
    #[tracing::instrument(
        name = "stock.service.reserve",
        skip(self),
        fields(variant = %variant, quantity),
        err
    )]
    async fn reserve(&self, variant: Uuid, quantity: u32) -> Result<(), StockServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.reserve(&mut tx, variant, quantity).await?;

        if rows_affected == 0 {
            return Err(StockServiceError::InsufficientStock { variant });
        }

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "stock.service.release",
        skip(self),
        fields(variant = %variant, quantity),
        err
    )]
    async fn release(&self, variant: Uuid, quantity: u32) -> Result<(), StockServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.release(&mut tx, variant, quantity).await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "stock.service.reserve_all",
        skip(self, reservations),
        fields(component_count = reservations.len()),
        err
    )]
    async fn reserve_all(&self, reservations: &[(Uuid, u32)]) -> Result<(), StockServiceError> {
        let mut tx = self.db.begin().await?;

        for &(variant, quantity) in reservations {
            let rows_affected = self.repository.reserve(&mut tx, variant, quantity).await?;

            if rows_affected == 0 {
                // Dropping the transaction rolls back every reservation
                // already granted in this attempt.
                return Err(StockServiceError::InsufficientStock { variant });
            }
        }

        tx.commit().await?;

        info!(component_count = reservations.len(), "reserved bundle stock");

        Ok(())
    }
}

/// Atomic stock reservation against the authoritative stock counters.
#[automock]
#[async_trait]
pub trait StockService: Send + Sync {
    /// Reserve `quantity` units of a variant.
    ///
    /// Decrements only if the current stock covers the quantity; fails
    /// without mutation otherwise.
    async fn reserve(&self, variant: Uuid, quantity: u32) -> Result<(), StockServiceError>;

    /// Return previously reserved units, compensating a failed multi-step
    /// operation.
    async fn release(&self, variant: Uuid, quantity: u32) -> Result<(), StockServiceError>;

    /// Reserve several variants as a unit: either every reservation is
    /// granted or none is.
    async fn reserve_all(&self, reservations: &[(Uuid, u32)]) -> Result<(), StockServiceError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn reserve_decrements_the_stock_counter() {
        let ctx = TestContext::new().await;
        let stock = ctx.stock();
        let variant = ctx.seed_variant(5).await;

        stock
            .reserve(variant, 3)
            .await
            .expect("reservation should be granted");

        assert_eq!(ctx.stock_of(variant).await, 2);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_the_counter_unchanged() {
        let ctx = TestContext::new().await;
        let stock = ctx.stock();
        let variant = ctx.seed_variant(2).await;

        let result = stock.reserve(variant, 3).await;

        assert!(
            matches!(result, Err(StockServiceError::InsufficientStock { variant: v }) if v == variant),
            "expected InsufficientStock, got {result:?}"
        );

        assert_eq!(ctx.stock_of(variant).await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_reservations_never_oversell() {
        let ctx = TestContext::new().await;
        let stock = Arc::new(ctx.stock());
        let variant = ctx.seed_variant(5).await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let stock = Arc::clone(&stock);

                tokio::spawn(async move { stock.reserve(variant, 1).await })
            })
            .collect();

        let mut granted = 0;

        for attempt in attempts {
            if attempt.await.expect("reservation task panicked").is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5, "exactly the available stock may be granted");
        assert_eq!(ctx.stock_of(variant).await, 0);
    }

    #[tokio::test]
    async fn failed_reserve_all_rolls_back_every_reservation() {
        let ctx = TestContext::new().await;
        let stock = ctx.stock();
        let covered = ctx.seed_variant(10).await;
        let short = ctx.seed_variant(1).await;

        let result = stock.reserve_all(&[(covered, 2), (short, 2)]).await;

        assert!(
            matches!(result, Err(StockServiceError::InsufficientStock { variant }) if variant == short),
            "expected InsufficientStock for the short variant, got {result:?}"
        );

        assert_eq!(
            ctx.stock_of(covered).await,
            10,
            "the reservation granted before the failure must roll back"
        );
        assert_eq!(ctx.stock_of(short).await, 1);
    }

    #[tokio::test]
    async fn release_returns_reserved_units() {
        let ctx = TestContext::new().await;
        let stock = ctx.stock();
        let variant = ctx.seed_variant(5).await;

        stock
            .reserve(variant, 4)
            .await
            .expect("reservation should be granted");

        stock
            .release(variant, 4)
            .await
            .expect("release should succeed");

        assert_eq!(ctx.stock_of(variant).await, 5);
    }
}
