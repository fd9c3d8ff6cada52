//! Cart Line Models

use jiff::Timestamp;
use trolley::lines::{PricingBasis, VariantKey};
use uuid::Uuid;

use crate::domain::identity::Owner;

/// Pricing basis annotations as stored on a line, referencing the granting
/// tier or offer by UUID.
pub type LinePricing = PricingBasis<Uuid>;

/// Cart Line Model
///
/// One entry in a cart: product, variant, quantity and the pricing basis it
/// was charged under. At most one line exists per
/// `(owner, product, variant key)`; adds merge instead of duplicating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub uuid: Uuid,
    pub owner: Owner,
    pub product_uuid: Uuid,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub original_unit_price: u64,
    pub pricing: LinePricing,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartLine {
    /// The variant key the line merges on.
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.size.as_str(), self.color.as_str())
    }

    /// The total charged for this line under its pricing basis.
    pub fn line_total(&self) -> u64 {
        self.pricing
            .charged_line_price(self.original_unit_price, self.quantity)
    }
}

/// New Cart Line Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub original_unit_price: u64,
    pub pricing: LinePricing,
}

impl NewCartLine {
    /// A plain line with no variant and no discount.
    #[must_use]
    pub fn regular(product_uuid: Uuid, quantity: u32, original_unit_price: u64) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            product_uuid,
            size: String::new(),
            color: String::new(),
            quantity,
            original_unit_price,
            pricing: LinePricing::Regular,
        }
    }

    /// The variant key the line merges on.
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.size.as_str(), self.color.as_str())
    }
}
