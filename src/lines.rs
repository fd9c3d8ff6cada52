//! Cart Lines
//!
//! Shared identity and pricing-basis types for cart lines. A line is unique
//! per `(owner, product, variant key)`; storage backends merge on that key
//! rather than ever creating duplicate lines.

use serde::{Deserialize, Serialize};

/// Identifies a product variant by its size and color.
///
/// Either part may be empty for non-variant products; two lines for the same
/// product merge only when their variant keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    size: String,
    color: String,
}

impl VariantKey {
    /// Create a variant key from a size and color.
    pub fn new(size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            color: color.into(),
        }
    }

    /// Key for a product without variants.
    pub fn none() -> Self {
        Self::new("", "")
    }

    /// The size part of the key (may be empty).
    pub fn size(&self) -> &str {
        &self.size
    }

    /// The color part of the key (may be empty).
    pub fn color(&self) -> &str {
        &self.color
    }
}

/// The discount mechanism under which a line was charged.
///
/// Each variant retains enough to reconstruct the charged price next to the
/// line's original unit price. Generic over the reference type `R` used to
/// point back at the tier or offer that granted the discount. Prices are in
/// minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingBasis<R> {
    /// Charged at the original unit price.
    Regular,

    /// Charged at a bulk tier's discounted unit price.
    Bulk {
        /// The tier that granted the discount.
        tier: R,
        /// Discounted unit price.
        unit_price: u64,
    },

    /// Charged at a bundle's allocated per-line price.
    ///
    /// The allocated price is the price of the whole line (the bundle sells
    /// its components as a unit), not a per-unit price; this is what keeps
    /// the sum of a bundle's lines exactly equal to its special price.
    Bundle {
        /// The offer the line belongs to.
        offer: R,
        /// Allocated price for the whole line.
        allocated_price: u64,
    },
}

impl<R> PricingBasis<R> {
    /// The total price charged for a line with this basis.
    ///
    /// Saturates at `u64::MAX` rather than overflowing on absurd inputs.
    pub fn charged_line_price(&self, original_unit_price: u64, quantity: u32) -> u64 {
        match self {
            PricingBasis::Regular => original_unit_price.saturating_mul(u64::from(quantity)),
            PricingBasis::Bulk { unit_price, .. } => unit_price.saturating_mul(u64::from(quantity)),
            PricingBasis::Bundle {
                allocated_price, ..
            } => *allocated_price,
        }
    }

    /// Whether the line carries no discount.
    pub fn is_regular(&self) -> bool {
        matches!(self, PricingBasis::Regular)
    }
}
