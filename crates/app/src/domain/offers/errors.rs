//! Offers service errors.

use sqlx::Error;
use thiserror::Error;
use trolley::discounts::DiscountError;

/// Offers service error variants.
#[derive(Debug, Error)]
pub enum OffersServiceError {
    /// Offer or tier table was not found.
    #[error("offer not found")]
    NotFound,

    /// A stored discount value did not fit price arithmetic.
    #[error("discount value out of range")]
    ValueOutOfRange,

    /// Price arithmetic failed.
    #[error("pricing calculation failed")]
    Pricing(#[from] DiscountError),

    /// Underlying SQL/storage error.
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OffersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        Self::Sql(error)
    }
}
