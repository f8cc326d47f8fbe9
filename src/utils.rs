// Utility modules

use ethers::{
    types::{Address, U256},
    utils::{format_units, parse_units},
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Rounds a price to a precision that keeps small values readable.
///
/// Values of 1 or more keep 2 decimals; smaller values keep progressively more
/// (4, 6, 8, then 10) so that a handful of significant digits survive.
pub fn smart_round(value: f64) -> f64 {
    let magnitude = value.abs();
    let decimals = if magnitude >= 1.0 {
        2
    } else if magnitude >= 0.01 {
        4
    } else if magnitude >= 0.0001 {
        6
    } else if magnitude >= 0.000001 {
        8
    } else {
        10
    };
    round_to(value, decimals)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Rounds a decimal to `places`, half away from zero, and strips trailing zeros.
pub fn round_decimal(value: Decimal, places: u32) -> Decimal {
    value
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

pub fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid amount: {}", raw)))
}

/// Parses a human amount ("1.5") into base units of a token with `decimals`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(AppError::BadRequest(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(AppError::BadRequest(format!(
                "Amount {} has more than {} decimals",
                trimmed, decimals
            )));
        }
    }
    let parsed = parse_units(trimmed, decimals as u32)
        .map_err(|e| AppError::BadRequest(format!("Invalid amount {}: {}", trimmed, e)))?;
    let value: U256 = parsed.into();
    if value.is_zero() {
        return Err(AppError::BadRequest(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Formats base units as a decimal string without trailing zeros ("1.0" stays "1.0").
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    match format_units(value, decimals as u32) {
        Ok(formatted) => trim_decimal_string(&formatted),
        Err(_) => value.to_string(),
    }
}

// Internal helper that parses or transforms values for `trim_decimal_string`.
fn trim_decimal_string(raw: &str) -> String {
    if !raw.contains('.') {
        return format!("{}.0", raw);
    }
    let trimmed = raw.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_address(raw: &str, label: &str) -> Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid {} address: {}", label, raw)))
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

pub fn format_address(address: Address) -> String {
    format!("{:?}", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_round_scales_precision_with_magnitude() {
        assert_eq!(smart_round(1.23456).to_string(), "1.23");
        assert_eq!(smart_round(0.012345).to_string(), "0.0123");
        assert_eq!(smart_round(0.00001234).to_string(), "0.00001234");
        assert_eq!(smart_round(2500.987).to_string(), "2500.99");
    }

    #[test]
    fn round_decimal_uses_half_away_from_zero() {
        let value = Decimal::from_str("2.0005").expect("decimal");
        assert_eq!(round_decimal(value, 3).to_string(), "2.001");
        let value = Decimal::from_str("1.5000").expect("decimal");
        assert_eq!(round_decimal(value, 3).to_string(), "1.5");
    }

    #[test]
    fn base_units_round_trip_keeps_readable_format() {
        let raw = to_base_units("1.5", 6).expect("units");
        assert_eq!(raw, U256::from(1_500_000u64));
        assert_eq!(format_token_amount(raw, 6), "1.5");
        assert_eq!(format_token_amount(U256::from(10u64).pow(18.into()), 18), "1.0");
        assert_eq!(format_token_amount(U256::zero(), 18), "0.0");
    }

    #[test]
    fn zero_and_garbage_amounts_are_rejected() {
        assert!(to_base_units("0", 18).is_err());
        assert!(to_base_units("abc", 18).is_err());
    }

    #[test]
    fn excess_fraction_digits_are_rejected() {
        let err = to_base_units("1.2345678", 6).expect_err("too precise");
        assert!(err.to_string().contains("more than 6 decimals"));
        let err = to_base_units("0.0000001", 6).expect_err("too precise");
        assert!(err.to_string().contains("more than 6 decimals"));
        assert_eq!(
            to_base_units("1.234567", 6).expect("exact fit"),
            U256::from(1_234_567u64)
        );
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some("USDT")));
    }
}
