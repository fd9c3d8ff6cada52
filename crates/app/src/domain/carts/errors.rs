//! Carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;
use trolley::{bundles::BundleError, discounts::DiscountError};
use uuid::Uuid;

use crate::domain::stock::StockServiceError;

/// Cart service error variants.
///
/// Every failure is scoped to the single attempted operation; nothing here is
/// fatal to the process. The optimistic update controller catches these at
/// the mutation boundary and rolls displayed state back before surfacing them.
#[derive(Debug, Error)]
pub enum CartsServiceError {
    /// A bundle component has no variant selected.
    #[error("no variant selected for product {product}")]
    MissingVariantSelection {
        /// The component product missing a selection.
        product: Uuid,
    },

    /// A mutation carried a zero quantity where a positive one is required.
    #[error("quantity must be positive")]
    InvalidQuantity,

    /// Stock reservation failed for a specific variant.
    #[error("insufficient stock for variant {variant}")]
    InsufficientStock {
        /// The variant that could not be reserved.
        variant: Uuid,
    },

    /// The bundle offer is outside its active window or usage cap.
    #[error("offer unavailable")]
    OfferUnavailable(#[source] BundleError),

    /// The operation requires an authenticated identity.
    #[error("authentication required")]
    AuthorizationRequired,

    /// The session is already authenticated; carts migrate exactly once.
    #[error("session already authenticated")]
    AlreadyAuthenticated,

    /// Line was not found.
    #[error("cart line not found")]
    NotFound,

    /// Line already exists.
    #[error("cart line already exists")]
    AlreadyExists,

    /// Price arithmetic failed.
    #[error("pricing calculation failed")]
    Pricing(#[from] DiscountError),

    /// A price or quantity did not fit its storage representation.
    #[error("value out of range")]
    ValueOutOfRange(#[from] std::num::TryFromIntError),

    /// Underlying SQL/storage error.
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<BundleError> for CartsServiceError {
    fn from(error: BundleError) -> Self {
        Self::OfferUnavailable(error)
    }
}

impl From<StockServiceError> for CartsServiceError {
    fn from(error: StockServiceError) -> Self {
        match error {
            StockServiceError::InsufficientStock { variant } => {
                Self::InsufficientStock { variant }
            }
            StockServiceError::Sql(e) => Self::Sql(e),
        }
    }
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation) => Self::NotFound,
            Some(ErrorKind::CheckViolation) => Self::InvalidQuantity,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
