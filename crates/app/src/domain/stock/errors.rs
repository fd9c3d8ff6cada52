//! Stock service errors.

use thiserror::Error;
use uuid::Uuid;

/// Stock service error variants.
#[derive(Debug, Error)]
pub enum StockServiceError {
    /// The variant's stock counter could not cover the requested quantity.
    #[error("insufficient stock for variant {variant}")]
    InsufficientStock {
        /// The variant that could not be reserved.
        variant: Uuid,
    },

    /// Underlying SQL/storage error.
    #[error("storage error")]
    Sql(#[from] sqlx::Error),
}
