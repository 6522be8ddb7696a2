//! Monetary arithmetic for currency conversion
//!
//! All amounts and rates are `BigDecimal`; floats never touch money. The
//! conversion rule is fixed: `converted = round_half_up(total * rate, 2)`,
//! where a value exactly at the midpoint rounds away from zero
//! (`10.005 -> 10.01`). Exchange rates are carried and displayed at four
//! decimal places as returned by the rate service.

use bigdecimal::{BigDecimal, RoundingMode};

/// Decimal places for converted monetary amounts.
pub const AMOUNT_SCALE: i64 = 2;

/// Decimal places for exchange rates.
pub const RATE_SCALE: i64 = 4;

/// Round a decimal half-up (midpoint away from zero) to the given scale.
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::HalfUp)
}

/// Apply an exchange rate to a total and round to cents.
pub fn convert_amount(total: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    round_half_up(&(total * rate), AMOUNT_SCALE)
}

/// Format an amount at two decimal places.
pub fn format_amount(value: &BigDecimal) -> String {
    value.with_scale_round(AMOUNT_SCALE, RoundingMode::HalfUp).to_string()
}

/// Format an exchange rate at four decimal places.
pub fn format_rate(value: &BigDecimal) -> String {
    value.with_scale_round(RATE_SCALE, RoundingMode::HalfUp).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_convert_rounds_down_below_midpoint() {
        // 19.995 * 1.2 = 23.994 -> 23.99
        let result = convert_amount(&dec("19.995"), &dec("1.2"));
        assert_eq!(result, dec("23.99"));
    }

    #[test]
    fn test_convert_exact_midpoint_rounds_away_from_zero() {
        // 10.005 * 1 sits exactly on the midpoint and must round up
        let result = convert_amount(&dec("10.005"), &dec("1"));
        assert_eq!(result, dec("10.01"));
    }

    #[test]
    fn test_negative_midpoint_rounds_away_from_zero() {
        let result = convert_amount(&dec("-10.005"), &dec("1"));
        assert_eq!(result, dec("-10.01"));
    }

    #[test]
    fn test_small_amount_rounds_up() {
        // 0.005 * 1.0 -> 0.01, not 0.00
        let result = convert_amount(&dec("0.005"), &dec("1.0"));
        assert_eq!(result, dec("0.01"));
    }

    #[test]
    fn test_format_rate_pads_to_four_places() {
        assert_eq!(format_rate(&dec("1.1")), "1.1000");
        assert_eq!(format_rate(&dec("3.65")), "3.6500");
    }

    #[test]
    fn test_format_amount_pads_to_two_places() {
        assert_eq!(format_amount(&dec("110")), "110.00");
        assert_eq!(format_amount(&dec("85.5")), "85.50");
    }
}
