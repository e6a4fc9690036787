//! Quantity conversions for quota arithmetic
//!
//! `k8s-openapi` treats `Quantity` as an opaque string. The reconciler needs
//! an approximate scalar to sum device-set capacities, and a compact
//! binary-SI rendering (e.g. "3Ti") for the hard limits it writes back.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::error::{Error, Result};

/// Binary suffixes, largest first, paired with their power-of-two shift.
const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ei", 60),
    ("Pi", 50),
    ("Ti", 40),
    ("Gi", 30),
    ("Mi", 20),
    ("Ki", 10),
];

/// Approximate scalar value of a quantity.
///
/// Malformed quantities contribute zero; callers on the metrics path must
/// not fail on bad data, and capacity sums treat absent requests the same
/// way.
pub fn approx_f64(quantity: &Quantity) -> f64 {
    parse_quantity(&quantity.0).unwrap_or(0.0)
}

/// Parse a quantity string (e.g. "1Ti", "500m", "2e3", "100") to a scalar.
pub fn parse_quantity(s: &str) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::CapacityParse("empty quantity string".into()));
    }

    // Find where the number ends and the suffix begins.
    let bytes = s.as_bytes();
    let mut num_end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        num_end = 1;
    }
    while num_end < s.len() && (bytes[num_end].is_ascii_digit() || bytes[num_end] == b'.') {
        num_end += 1;
    }

    // An 'e'/'E' followed by digits is scientific notation, not the exa
    // suffix: "2e3" is 2000, "2E" is 2 exa.
    if num_end < s.len() && (bytes[num_end] == b'e' || bytes[num_end] == b'E') {
        let mut exp_start = num_end + 1;
        if matches!(bytes.get(exp_start), Some(b'+') | Some(b'-')) {
            exp_start += 1;
        }
        if exp_start < s.len() && bytes[exp_start..].iter().all(u8::is_ascii_digit) {
            return s
                .parse::<f64>()
                .map_err(|_| Error::CapacityParse(format!("invalid number: {}", s)));
        }
    }

    let num: f64 = s[..num_end]
        .parse()
        .map_err(|_| Error::CapacityParse(format!("invalid number: {}", &s[..num_end])))?;

    let multiplier: f64 = match &s[num_end..] {
        "" => 1.0,
        "Ki" => (1u64 << 10) as f64,
        "Mi" => (1u64 << 20) as f64,
        "Gi" => (1u64 << 30) as f64,
        "Ti" => (1u64 << 40) as f64,
        "Pi" => (1u64 << 50) as f64,
        "Ei" => (1u64 << 60) as f64,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        suffix => {
            return Err(Error::CapacityParse(format!("unknown suffix: {}", suffix)));
        }
    };

    Ok(num * multiplier)
}

/// Render a byte count as a quantity in compact binary-SI form, choosing the
/// largest power-of-1024 suffix that divides the value exactly.
pub fn binary_quantity(value: i64) -> Quantity {
    Quantity(format_binary(value))
}

fn format_binary(value: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    for (suffix, shift) in BINARY_SUFFIXES {
        if value.unsigned_abs() & ((1u64 << shift) - 1) == 0 {
            // Exact multiple; arithmetic shift preserves the sign.
            return format!("{}{}", value >> shift, suffix);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TIB: f64 = (1u64 << 40) as f64;

    #[test]
    fn test_parse_binary_suffixes() {
        assert_eq!(parse_quantity("1Ki").unwrap(), 1024.0);
        assert_eq!(parse_quantity("1Gi").unwrap(), (1u64 << 30) as f64);
        assert_eq!(parse_quantity("1Ti").unwrap(), TIB);
        assert_eq!(parse_quantity("1.5Gi").unwrap(), 1.5 * (1u64 << 30) as f64);
    }

    #[test]
    fn test_parse_decimal_suffixes() {
        assert_eq!(parse_quantity("500m").unwrap(), 0.5);
        assert_eq!(parse_quantity("2k").unwrap(), 2000.0);
        assert_eq!(parse_quantity("3G").unwrap(), 3e9);
        assert_eq!(parse_quantity("2E").unwrap(), 2e18);
    }

    #[test]
    fn test_parse_plain_and_scientific() {
        assert_eq!(parse_quantity("100").unwrap(), 100.0);
        assert_eq!(parse_quantity("-5").unwrap(), -5.0);
        assert_eq!(parse_quantity("2e3").unwrap(), 2000.0);
        assert_eq!(parse_quantity("1E6").unwrap(), 1e6);
    }

    #[test]
    fn test_parse_errors() {
        assert_matches!(parse_quantity(""), Err(Error::CapacityParse(_)));
        assert_matches!(parse_quantity("1Zi"), Err(Error::CapacityParse(_)));
        assert_matches!(parse_quantity("abc"), Err(Error::CapacityParse(_)));
    }

    #[test]
    fn test_approx_f64_malformed_is_zero() {
        assert_eq!(approx_f64(&Quantity("nonsense".to_string())), 0.0);
        assert_eq!(approx_f64(&Quantity("2Ti".to_string())), 2.0 * TIB);
    }

    #[test]
    fn test_format_binary() {
        assert_eq!(binary_quantity(0).0, "0");
        assert_eq!(binary_quantity(3 * (1i64 << 40)).0, "3Ti");
        assert_eq!(binary_quantity(1i64 << 30).0, "1Gi");
        // 1.5Ki is not an exact multiple of any suffix.
        assert_eq!(binary_quantity(1536).0, "1536");
        assert_eq!(binary_quantity(-(2i64 << 40)).0, "-2Ti");
    }
}
