//! Stock Repository
//!
//! The reserve statement is a single compare-and-decrement: the decrement and
//! the `stock >= quantity` guard execute as one indivisible row update, so
//! two concurrent buyers can never both pass a stale client-side check and
//! oversell the same unit.

use sqlx::{Postgres, Transaction, query};
use uuid::Uuid;

const RESERVE_STOCK_SQL: &str = include_str!("sql/reserve_stock.sql");
const RELEASE_STOCK_SQL: &str = include_str!("sql/release_stock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgStockRepository;

impl PgStockRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Attempt the atomic decrement; zero rows affected means the guard
    /// rejected the reservation.
    pub(crate) async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: Uuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let result = query(RESERVE_STOCK_SQL)
            .bind(variant)
            .bind(i64::from(quantity))
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn release(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: Uuid,
        quantity: u32,
    ) -> Result<(), sqlx::Error> {
        query(RELEASE_STOCK_SQL)
            .bind(variant)
            .bind(i64::from(quantity))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}
