//! Bundle Offers
//!
//! A bundle (special offer) sells a fixed set of component products as a unit
//! for a single `special_price`. The resolver validates offer eligibility
//! (active window, usage cap) and allocates the special price across the
//! component lines so that the allocated prices sum to the special price
//! exactly, with no rounding drift.

use jiff::Timestamp;
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// Errors related to bundle eligibility and price allocation.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The offer's active window has not yet opened.
    #[error("offer is not yet active")]
    NotYetActive,

    /// The offer's active window has closed.
    #[error("offer has expired")]
    Expired,

    /// The offer's usage cap has been reached.
    #[error("offer usage cap exhausted")]
    UsageCapExhausted,

    /// A bundle must have at least one component line.
    #[error("bundle has no component lines")]
    NoComponents,

    /// The component count cannot be represented in price arithmetic.
    #[error("bundle has too many component lines")]
    TooManyComponents,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// One component line of a bundle: a product and the quantity the bundle includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleComponent<P> {
    product: P,
    quantity: u32,
}

impl<P> BundleComponent<P> {
    /// Create a new component line.
    pub fn new(product: P, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// The component's product reference.
    pub fn product(&self) -> &P {
        &self.product
    }

    /// Units of the product included in the bundle.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// A fixed-price multi-product bundle offer.
///
/// Generic over the product reference type `P` so the storage layer can use
/// its own identifiers. Offers are consumed read-only here; `current_uses`
/// is incremented by order finalization after successful checkout, which
/// this engine does not own.
#[derive(Debug, Clone)]
pub struct BundleOffer<'a, P> {
    special_price: Money<'a, Currency>,
    original_price: Money<'a, Currency>,
    components: Vec<BundleComponent<P>>,
    starts_at: Timestamp,
    ends_at: Option<Timestamp>,
    max_uses: Option<u32>,
    current_uses: u32,
}

impl<'a, P> BundleOffer<'a, P> {
    /// Create a new bundle offer.
    pub fn new(
        special_price: Money<'a, Currency>,
        original_price: Money<'a, Currency>,
        components: Vec<BundleComponent<P>>,
        starts_at: Timestamp,
        ends_at: Option<Timestamp>,
        max_uses: Option<u32>,
        current_uses: u32,
    ) -> Self {
        Self {
            special_price,
            original_price,
            components,
            starts_at,
            ends_at,
            max_uses,
            current_uses,
        }
    }

    /// The fixed total price of the bundle.
    pub fn special_price(&self) -> &Money<'a, Currency> {
        &self.special_price
    }

    /// The informational sum of component prices before the offer.
    pub fn original_price(&self) -> &Money<'a, Currency> {
        &self.original_price
    }

    /// The component lines.
    pub fn components(&self) -> &[BundleComponent<P>] {
        &self.components
    }

    /// How much the buyer saves against the original price (informational).
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] on currency mismatch.
    pub fn savings(&self) -> Result<Money<'a, Currency>, MoneyError> {
        self.original_price.sub(self.special_price)
    }

    /// Check that the offer is purchasable at `now`.
    ///
    /// An offer is purchasable while `now` is within its active window and
    /// its usage cap (if any) has headroom.
    ///
    /// # Errors
    ///
    /// - [`BundleError::NotYetActive`] before the window opens.
    /// - [`BundleError::Expired`] after the window closes.
    /// - [`BundleError::UsageCapExhausted`] once `current_uses` reaches `max_uses`.
    pub fn availability(&self, now: Timestamp) -> Result<(), BundleError> {
        if now < self.starts_at {
            return Err(BundleError::NotYetActive);
        }

        if self.ends_at.is_some_and(|ends_at| now > ends_at) {
            return Err(BundleError::Expired);
        }

        if self
            .max_uses
            .is_some_and(|max_uses| self.current_uses >= max_uses)
        {
            return Err(BundleError::UsageCapExhausted);
        }

        Ok(())
    }

    /// Allocate the special price across this offer's component lines.
    ///
    /// See [`allocate_component_prices`].
    ///
    /// # Errors
    ///
    /// Returns a [`BundleError`] if the offer has no components.
    pub fn line_allocation(&self) -> Result<Vec<Money<'a, Currency>>, BundleError> {
        allocate_component_prices(&self.special_price, self.components.len())
    }
}

/// Split a bundle's special price equally across `n` component lines.
///
/// Division happens in minor units; the remainder is assigned to the first
/// line so the allocated prices always sum to `special_price` exactly. Naive
/// equal division can drift by a minor unit or two, which would charge the
/// buyer a different total than the advertised bundle price.
///
/// # Errors
///
/// - [`BundleError::NoComponents`] if `n` is zero.
/// - [`BundleError::TooManyComponents`] if `n` does not fit price arithmetic.
pub fn allocate_component_prices<'a>(
    special_price: &Money<'a, Currency>,
    n: usize,
) -> Result<Vec<Money<'a, Currency>>, BundleError> {
    if n == 0 {
        return Err(BundleError::NoComponents);
    }

    let Ok(count) = i64::try_from(n) else {
        return Err(BundleError::TooManyComponents);
    };

    let total_minor = special_price.to_minor_units();
    let base = total_minor.div_euclid(count);
    let remainder = total_minor - base * count;
    let currency = special_price.currency();

    Ok((0..count)
        .map(|i| {
            let minor = if i == 0 { base + remainder } else { base };

            Money::from_minor(minor, currency)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    fn offer<'a>(
        starts_at: Timestamp,
        ends_at: Option<Timestamp>,
        max_uses: Option<u32>,
        current_uses: u32,
    ) -> BundleOffer<'a, u32> {
        BundleOffer::new(
            Money::from_minor(500, GBP),
            Money::from_minor(800, GBP),
            vec![
                BundleComponent::new(1, 1),
                BundleComponent::new(2, 1),
                BundleComponent::new(3, 1),
            ],
            starts_at,
            ends_at,
            max_uses,
            current_uses,
        )
    }

    fn ts(second: i64) -> Timestamp {
        Timestamp::from_second(second).unwrap_or_default()
    }

    #[test]
    fn allocation_sums_exactly_to_special_price() -> TestResult {
        // 1000 does not divide by 3; the remainder lands on the first line.
        let prices = allocate_component_prices(&Money::from_minor(1000, GBP), 3)?;

        let minors: Vec<i64> = prices.iter().map(Money::to_minor_units).collect();

        assert_eq!(minors, vec![334, 333, 333]);
        assert_eq!(minors.iter().sum::<i64>(), 1000);

        Ok(())
    }

    #[test]
    fn allocation_conserves_total_for_awkward_divisions() -> TestResult {
        for (total, n) in [(999, 7), (1, 3), (500, 3), (101, 2), (10_000, 9)] {
            let prices = allocate_component_prices(&Money::from_minor(total, GBP), n)?;

            let sum: i64 = prices.iter().map(Money::to_minor_units).sum();

            assert_eq!(sum, total, "allocation of {total} over {n} lines drifted");
            assert_eq!(prices.len(), n, "expected one price per component line");
        }

        Ok(())
    }

    #[test]
    fn allocation_of_even_division_is_equal() -> TestResult {
        let prices = allocate_component_prices(&Money::from_minor(900, GBP), 3)?;

        assert!(
            prices.iter().all(|p| p.to_minor_units() == 300),
            "even division should allocate equally"
        );

        Ok(())
    }

    #[test]
    fn allocation_with_no_components_errors() {
        let result = allocate_component_prices(&Money::from_minor(500, GBP), 0);

        assert!(matches!(result, Err(BundleError::NoComponents)));
    }

    #[test]
    fn availability_inside_window_succeeds() -> TestResult {
        let offer = offer(ts(100), Some(ts(200)), None, 0);

        offer.availability(ts(150))?;

        Ok(())
    }

    #[test]
    fn availability_before_window_is_not_yet_active() {
        let offer = offer(ts(100), Some(ts(200)), None, 0);

        assert!(matches!(
            offer.availability(ts(99)),
            Err(BundleError::NotYetActive)
        ));
    }

    #[test]
    fn availability_after_window_is_expired() {
        let offer = offer(ts(100), Some(ts(200)), None, 0);

        assert!(matches!(
            offer.availability(ts(201)),
            Err(BundleError::Expired)
        ));
    }

    #[test]
    fn availability_without_end_date_never_expires() -> TestResult {
        let offer = offer(ts(100), None, None, 0);

        offer.availability(ts(1_000_000_000))?;

        Ok(())
    }

    #[test]
    fn availability_at_usage_cap_is_exhausted() {
        let offer = offer(ts(100), None, Some(3), 3);

        assert!(matches!(
            offer.availability(ts(150)),
            Err(BundleError::UsageCapExhausted)
        ));
    }

    #[test]
    fn availability_below_usage_cap_succeeds() -> TestResult {
        let offer = offer(ts(100), None, Some(3), 2);

        offer.availability(ts(150))?;

        Ok(())
    }

    #[test]
    fn line_allocation_covers_every_component() -> TestResult {
        let offer = offer(ts(100), None, None, 0);

        let prices = offer.line_allocation()?;

        assert_eq!(prices.len(), offer.components().len());
        assert_eq!(
            prices.iter().map(Money::to_minor_units).sum::<i64>(),
            offer.special_price().to_minor_units()
        );

        Ok(())
    }

    #[test]
    fn savings_is_original_minus_special() -> TestResult {
        let offer = offer(ts(100), None, None, 0);

        assert_eq!(offer.savings()?, Money::from_minor(300, GBP));

        Ok(())
    }
}
