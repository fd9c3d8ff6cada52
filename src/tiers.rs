//! Bulk Pricing Tiers
//!
//! Quantity threshold bands granting a bulk discount. Given the total
//! quantity of a tiered product across the cart, [`resolve_tier`] selects the
//! applicable band and [`tier_unit_price`] computes the discounted unit price.

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};

use crate::discounts::{DiscountError, percent_of_minor};

/// Discount variants a bulk tier can grant.
#[derive(Debug, Clone)]
pub enum TierDiscount<'a> {
    /// Percentage off the base unit price.
    PercentOff(Percentage),

    /// Fixed amount subtracted from the base unit price.
    AmountOff(Money<'a, Currency>),

    /// The unit price is overridden to a fixed amount.
    FixedUnitPrice(Money<'a, Currency>),
}

/// A single quantity band within a product's bulk tier table.
#[derive(Debug, Clone)]
pub struct BulkTier<'a> {
    min_quantity: u32,
    max_quantity: Option<u32>,
    discount: TierDiscount<'a>,
}

impl<'a> BulkTier<'a> {
    /// Create a new tier covering `[min_quantity, max_quantity]`.
    ///
    /// A `max_quantity` of `None` means the band is unbounded above.
    pub fn new(min_quantity: u32, max_quantity: Option<u32>, discount: TierDiscount<'a>) -> Self {
        Self {
            min_quantity,
            max_quantity,
            discount,
        }
    }

    /// Lower bound of the band (inclusive).
    pub fn min_quantity(&self) -> u32 {
        self.min_quantity
    }

    /// Upper bound of the band (inclusive), `None` if unbounded.
    pub fn max_quantity(&self) -> Option<u32> {
        self.max_quantity
    }

    /// The discount this band grants.
    pub fn discount(&self) -> &TierDiscount<'a> {
        &self.discount
    }

    /// Whether the given total quantity falls within this band.
    pub fn contains(&self, quantity: u32) -> bool {
        self.min_quantity <= quantity && self.max_quantity.is_none_or(|max| quantity <= max)
    }
}

/// Select the tier applicable to the given total quantity.
///
/// Returns the matching tier with the largest `min_quantity`, or `None` if no
/// band contains the quantity. Tier tables should not overlap, but when a
/// data-entry error produces overlapping bands the highest matching
/// `min_quantity` wins.
///
/// Zero quantity is a caller precondition: an empty or removed line never
/// reaches tier resolution.
pub fn resolve_tier<'a, 'b>(
    quantity: u32,
    tiers: &'b [BulkTier<'a>],
) -> Option<&'b BulkTier<'a>> {
    tiers
        .iter()
        .filter(|tier| tier.contains(quantity))
        .max_by_key(|tier| tier.min_quantity())
}

/// Calculate the unit price granted by a matched tier.
///
/// Prices never go below zero: an `AmountOff` larger than the base price
/// clamps to a free unit.
///
/// # Errors
///
/// Returns a [`DiscountError`] if:
/// - Percentage calculation overflows or cannot be safely represented.
/// - Money arithmetic fails (e.g., currency mismatch).
pub fn tier_unit_price<'a>(
    base: &Money<'a, Currency>,
    tier: &BulkTier<'a>,
) -> Result<Money<'a, Currency>, DiscountError> {
    let discounted_minor = match tier.discount() {
        TierDiscount::PercentOff(pct) => {
            let base_minor = base.to_minor_units();

            base_minor.saturating_sub(percent_of_minor(pct, base_minor)?)
        }
        TierDiscount::AmountOff(amount) => base.sub(*amount)?.to_minor_units(),
        TierDiscount::FixedUnitPrice(amount) => amount.to_minor_units(),
    };

    Ok(Money::from_minor(0.max(discounted_minor), base.currency()))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    fn percent_tiers<'a>() -> [BulkTier<'a>; 3] {
        [
            BulkTier::new(10, Some(24), TierDiscount::PercentOff(Percentage::from(0.10))),
            BulkTier::new(25, Some(49), TierDiscount::PercentOff(Percentage::from(0.15))),
            BulkTier::new(50, None, TierDiscount::PercentOff(Percentage::from(0.20))),
        ]
    }

    fn unit_price_for(quantity: u32) -> Result<Option<i64>, DiscountError> {
        let tiers = percent_tiers();
        let base = Money::from_minor(100, GBP);

        resolve_tier(quantity, &tiers)
            .map(|tier| tier_unit_price(&base, tier).map(|m| m.to_minor_units()))
            .transpose()
    }

    #[test]
    fn below_first_tier_matches_nothing() -> TestResult {
        assert_eq!(unit_price_for(9)?, None);

        Ok(())
    }

    #[test]
    fn boundary_quantities_select_expected_tiers() -> TestResult {
        assert_eq!(unit_price_for(10)?, Some(90));
        assert_eq!(unit_price_for(24)?, Some(90));
        assert_eq!(unit_price_for(25)?, Some(85));
        assert_eq!(unit_price_for(49)?, Some(85));
        assert_eq!(unit_price_for(50)?, Some(80));

        Ok(())
    }

    #[test]
    fn unbounded_tier_matches_large_quantities() -> TestResult {
        assert_eq!(unit_price_for(10_000)?, Some(80));

        Ok(())
    }

    #[test]
    fn overlapping_tiers_resolve_to_highest_min_quantity() {
        // A data-entry error: both bands contain quantity 30.
        let tiers = [
            BulkTier::new(10, Some(40), TierDiscount::PercentOff(Percentage::from(0.10))),
            BulkTier::new(25, Some(49), TierDiscount::PercentOff(Percentage::from(0.15))),
        ];

        let resolved = resolve_tier(30, &tiers);

        assert_eq!(
            resolved.map(BulkTier::min_quantity),
            Some(25),
            "highest matching min_quantity should win"
        );
    }

    #[test]
    fn amount_off_subtracts_from_base() -> TestResult {
        let tier = BulkTier::new(
            10,
            None,
            TierDiscount::AmountOff(Money::from_minor(30, GBP)),
        );

        let unit = tier_unit_price(&Money::from_minor(100, GBP), &tier)?;

        assert_eq!(unit, Money::from_minor(70, GBP));

        Ok(())
    }

    #[test]
    fn amount_off_clamps_to_zero() -> TestResult {
        let tier = BulkTier::new(
            10,
            None,
            TierDiscount::AmountOff(Money::from_minor(500, GBP)),
        );

        let unit = tier_unit_price(&Money::from_minor(100, GBP), &tier)?;

        assert_eq!(unit, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn fixed_unit_price_overrides_base() -> TestResult {
        let tier = BulkTier::new(
            10,
            None,
            TierDiscount::FixedUnitPrice(Money::from_minor(42, GBP)),
        );

        let unit = tier_unit_price(&Money::from_minor(100, GBP), &tier)?;

        assert_eq!(unit, Money::from_minor(42, GBP));

        Ok(())
    }

    #[test]
    fn fixed_unit_price_clamps_negative_to_zero() -> TestResult {
        let tier = BulkTier::new(
            10,
            None,
            TierDiscount::FixedUnitPrice(Money::from_minor(-42, GBP)),
        );

        let unit = tier_unit_price(&Money::from_minor(100, GBP), &tier)?;

        assert_eq!(unit, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn adjacent_bands_do_not_overlap() {
        let tiers = percent_tiers();

        for quantity in [10u32, 24, 25, 49, 50, 100] {
            let matching = tiers.iter().filter(|t| t.contains(quantity)).count();

            assert_eq!(matching, 1, "quantity {quantity} should match exactly one band");
        }
    }
}
