//! Discounts
//!
//! Shared minor-unit percentage arithmetic used by tier and bundle pricing.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::MoneyError;
use thiserror::Error;

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// Rounds midpoints away from zero so a 15% discount on 150 minor units is 23, not 22.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the multiplication result
/// cannot be represented in minor units.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    // Multiplying by ONE extracts the percentage as a Decimal, which the
    // decimal_percentage crate does not expose directly.
    ((*percent) * Decimal::ONE)
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_minor_quarter_of_two_hundred() -> testresult::TestResult {
        let percent = Percentage::from(0.25);

        assert_eq!(percent_of_minor(&percent, 200)?, 50);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_midpoint_away_from_zero() -> testresult::TestResult {
        // 15% of 150 is 22.5, which rounds to 23.
        let percent = Percentage::from(0.15);

        assert_eq!(percent_of_minor(&percent, 150)?, 23);

        Ok(())
    }

    #[test]
    fn percent_of_minor_zero_percent_is_zero() -> testresult::TestResult {
        let percent = Percentage::from(0.0);

        assert_eq!(percent_of_minor(&percent, 12345)?, 0);

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_error() {
        let percent = Percentage::from(2.0);
        let result = percent_of_minor(&percent, i64::MAX);

        assert!(matches!(result, Err(DiscountError::PercentConversion)));
    }

    #[test]
    fn percent_of_minor_negative_minor_rounds_away_from_zero() -> testresult::TestResult {
        let percent = Percentage::from(0.15);

        assert_eq!(percent_of_minor(&percent, -150)?, -23);

        Ok(())
    }
}
