//! Offer Models

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use trolley::{
    bundles::{BundleComponent, BundleOffer},
    tiers::{BulkTier, TierDiscount},
};
use uuid::Uuid;

use crate::domain::offers::errors::OffersServiceError;

/// How a tier row expresses its discount value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierDiscountKind {
    /// `discount_value` is a percentage (e.g. `15` for 15% off).
    Percentage,
    /// `discount_value` is an amount off the unit price, in minor units.
    FixedAmountOff,
    /// `discount_value` is the overridden unit price, in minor units.
    FixedUnitPrice,
}

/// One row of a product's bulk tier table.
#[derive(Debug, Clone)]
pub struct BulkTierRecord {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub discount_kind: TierDiscountKind,
    pub discount_value: Decimal,
}

impl BulkTierRecord {
    /// Convert the row into the pricing core's tier type.
    ///
    /// # Errors
    ///
    /// Returns [`OffersServiceError::ValueOutOfRange`] if the stored discount
    /// value cannot be represented in minor units.
    pub fn to_bulk_tier(
        &self,
        currency: &'static Currency,
    ) -> Result<BulkTier<'static>, OffersServiceError> {
        let discount = match self.discount_kind {
            TierDiscountKind::Percentage => {
                TierDiscount::PercentOff(Percentage::from(self.discount_value / Decimal::from(100)))
            }
            TierDiscountKind::FixedAmountOff => {
                let minor = self
                    .discount_value
                    .to_i64()
                    .ok_or(OffersServiceError::ValueOutOfRange)?;

                TierDiscount::AmountOff(Money::from_minor(minor, currency))
            }
            TierDiscountKind::FixedUnitPrice => {
                let minor = self
                    .discount_value
                    .to_i64()
                    .ok_or(OffersServiceError::ValueOutOfRange)?;

                TierDiscount::FixedUnitPrice(Money::from_minor(minor, currency))
            }
        };

        Ok(BulkTier::new(self.min_quantity, self.max_quantity, discount))
    }
}

/// One component row of a special offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferComponent {
    pub product_uuid: Uuid,
    pub quantity: u32,
}

/// A special offer: header row plus its ordered component rows.
#[derive(Debug, Clone)]
pub struct Offer {
    pub uuid: Uuid,
    pub special_price: u64,
    pub original_price: u64,
    pub starts_at: Timestamp,
    pub ends_at: Option<Timestamp>,
    pub max_uses: Option<u32>,
    pub current_uses: u32,
    pub components: Vec<OfferComponent>,
}

impl Offer {
    /// Convert the offer into the pricing core's bundle type.
    ///
    /// # Errors
    ///
    /// Returns [`OffersServiceError::ValueOutOfRange`] if a stored price does
    /// not fit minor-unit arithmetic.
    pub fn to_bundle(
        &self,
        currency: &'static Currency,
    ) -> Result<BundleOffer<'static, Uuid>, OffersServiceError> {
        let special = i64::try_from(self.special_price)
            .map_err(|_| OffersServiceError::ValueOutOfRange)?;

        let original = i64::try_from(self.original_price)
            .map_err(|_| OffersServiceError::ValueOutOfRange)?;

        Ok(BundleOffer::new(
            Money::from_minor(special, currency),
            Money::from_minor(original, currency),
            self.components
                .iter()
                .map(|c| BundleComponent::new(c.product_uuid, c.quantity))
                .collect(),
            self.starts_at,
            self.ends_at,
            self.max_uses,
            self.current_uses,
        ))
    }
}

/// The bulk pricing resolved for a line, ready to annotate it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPricing {
    /// The tier that granted the discount.
    pub tier_uuid: Uuid,
    /// Discounted unit price in minor units.
    pub unit_price: u64,
}
