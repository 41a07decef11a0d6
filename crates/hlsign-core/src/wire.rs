//! Numeric and address wire conversions.
//!
//! Prices and sizes travel as decimal strings with at most 8 decimals. A value
//! that would lose precision is rejected, never truncated.

use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;

use crate::error::{SigningError, SigningResult};

/// Max decimals on the wire.
pub const WIRE_DECIMALS: u32 = 8;

/// Decimals used when scaling floats for hashing.
pub const HASHING_DECIMALS: u32 = 8;

/// Decimals of USD amounts (e.g. isolated margin `ntli`).
pub const USD_DECIMALS: u32 = 6;

const WIRE_TOLERANCE: f64 = 1e-12;
const INT_TOLERANCE: f64 = 1e-3;

/// Format a float for the wire.
///
/// Rounds to 8 decimals, fails if that changed the value by `>= 1e-12`,
/// maps `-0` to `0` and strips trailing zeros and a bare trailing point.
///
/// ```
/// use hlsign_core::wire::float_to_wire;
/// assert_eq!(float_to_wire(1670.1).unwrap(), "1670.1");
/// assert_eq!(float_to_wire(100.0).unwrap(), "100");
/// ```
pub fn float_to_wire(x: f64) -> SigningResult<String> {
    let rounded = format!("{:.*}", WIRE_DECIMALS as usize, x);
    let parsed: f64 = rounded
        .parse()
        .map_err(|_| SigningError::FloatToWire { value: x })?;
    if !((parsed - x).abs() < WIRE_TOLERANCE) {
        return Err(SigningError::FloatToWire { value: x });
    }

    let rounded = if rounded == "-0.00000000" {
        "0.00000000".to_string()
    } else {
        rounded
    };
    Ok(strip_trailing_zeros(&rounded))
}

/// Scale a float by `10^decimals` into an integer.
///
/// Fails if the scaled value is not within `1e-3` of an integer.
pub fn float_to_int(x: f64, decimals: u32) -> SigningResult<i64> {
    let scaled = x * 10f64.powi(decimals as i32);
    let rounded = scaled.round();
    if !((rounded - scaled).abs() < INT_TOLERANCE)
        || rounded < i64::MIN as f64
        || rounded >= i64::MAX as f64
    {
        return Err(SigningError::FloatToInt { value: x, decimals });
    }
    Ok(rounded as i64)
}

pub fn float_to_int_for_hashing(x: f64) -> SigningResult<i64> {
    float_to_int(x, HASHING_DECIMALS)
}

pub fn float_to_usd_int(x: f64) -> SigningResult<i64> {
    float_to_int(x, USD_DECIMALS)
}

/// Exact-decimal variant of [`float_to_wire`].
///
/// Values with more than 8 significant decimal places are rejected.
pub fn decimal_to_wire(value: Decimal) -> SigningResult<String> {
    let normalized = value.normalize();
    if normalized.scale() > WIRE_DECIMALS {
        return Err(SigningError::DecimalToWire {
            value: value.to_string(),
        });
    }
    if normalized.is_zero() {
        return Ok("0".to_string());
    }
    Ok(normalized.to_string())
}

fn strip_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse a 20-byte hex address (`0x` prefix required).
pub fn parse_address(input: &str) -> SigningResult<Address> {
    let invalid = |reason: &str| SigningError::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| invalid("missing 0x prefix"))?;
    if digits.len() != 40 {
        return Err(invalid("expected 40 hex digits"));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("non-hex character"));
    }
    Address::from_str(digits).map_err(|e| invalid(&e.to_string()))
}

/// Lowercase hex form of an address, as required inside signed messages.
pub fn address_to_wire(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Validate and lowercase an address string.
pub fn normalize_address(input: &str) -> SigningResult<String> {
    parse_address(input).map(|a| address_to_wire(&a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_float_to_wire() {
        assert_eq!(float_to_wire(1670.1).unwrap(), "1670.1");
        assert_eq!(float_to_wire(100.0).unwrap(), "100");
        assert_eq!(float_to_wire(0.0147).unwrap(), "0.0147");
        assert_eq!(float_to_wire(0.00000001).unwrap(), "0.00000001");
        assert_eq!(float_to_wire(-0.0).unwrap(), "0");
        assert_eq!(float_to_wire(0.0).unwrap(), "0");
        assert_eq!(float_to_wire(-1.5).unwrap(), "-1.5");
        assert_eq!(float_to_wire(123456789.0).unwrap(), "123456789");
    }

    #[test]
    fn test_float_to_wire_rejects_excess_precision() {
        for x in [0.000000001, 1.123456789, 1670.123456789] {
            let err = float_to_wire(x).unwrap_err();
            assert!(
                matches!(err, SigningError::FloatToWire { value } if value == x),
                "{x} -> {err:?}"
            );
        }
        assert!(float_to_wire(f64::NAN).is_err());
    }

    #[test]
    fn test_float_to_int() {
        assert_eq!(float_to_int_for_hashing(1000.0).unwrap(), 100_000_000_000);
        assert_eq!(float_to_usd_int(1.5).unwrap(), 1_500_000);
        assert_eq!(float_to_int(0.1, 2).unwrap(), 10);
        assert_eq!(float_to_int(-2.5, 1).unwrap(), -25);
        assert!(matches!(
            float_to_int(0.12345, 2),
            Err(SigningError::FloatToInt { decimals: 2, .. })
        ));
        assert!(float_to_usd_int(0.0000001).is_err());
    }

    #[test]
    fn test_decimal_to_wire() {
        assert_eq!(decimal_to_wire(dec!(1670.10)).unwrap(), "1670.1");
        assert_eq!(decimal_to_wire(dec!(100.000)).unwrap(), "100");
        assert_eq!(decimal_to_wire(dec!(-0.0)).unwrap(), "0");
        assert_eq!(decimal_to_wire(dec!(0.00000001)).unwrap(), "0.00000001");
        assert!(matches!(
            decimal_to_wire(dec!(0.000000001)),
            Err(SigningError::DecimalToWire { .. })
        ));
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0x1719884eb866cb12b2287399b15f7db5e7d775ea").unwrap();
        assert_eq!(
            address_to_wire(&addr),
            "0x1719884eb866cb12b2287399b15f7db5e7d775ea"
        );
        assert_eq!(
            normalize_address("0x5E9EE1089755C3435139848E47E6635505D5A13A").unwrap(),
            "0x5e9ee1089755c3435139848e47e6635505d5a13a"
        );

        for bad in [
            "1719884eb866cb12b2287399b15f7db5e7d775ea",
            "0x1719884eb866cb12b2287399b15f7db5e7d775",
            "0x1719884eb866cb12b2287399b15f7db5e7d775eaff",
            "0x1719884eb866cb12b2287399b15f7db5e7d775eg",
        ] {
            assert!(
                matches!(parse_address(bad), Err(SigningError::InvalidAddress { .. })),
                "{bad}"
            );
        }
    }
}
