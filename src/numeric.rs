//! Exact decimal <-> hex conversion for values beyond native integer precision
//!
//! Numbers are held as little-endian digit vectors in the target base and
//! combined with schoolbook addition and multiply-by-small-number, so block
//! heights and wei amounts of any length convert without loss.

use crate::error::InputError;
use std::cmp::Ordering;

/// Default two's-complement width for negative decimal input
pub const DEFAULT_BIT_WIDTH: u32 = 32;

/// Widest two's-complement width accepted for `bit_width`
pub const MAX_BIT_WIDTH: u32 = 4096;

/// Little-endian digits in some base
type Digits = Vec<u32>;

/// Convert a digit string between positional bases (2..=36).
///
/// Returns `None` on an unparseable digit or unsupported base. Empty input
/// converts to `"0"`.
pub fn convert_base(digits: &str, from_base: u32, to_base: u32) -> Option<String> {
    try_convert_base(digits, from_base, to_base).ok()
}

/// Like [`convert_base`] but reports which digit was rejected
pub fn try_convert_base(digits: &str, from_base: u32, to_base: u32) -> Result<String, InputError> {
    check_base(from_base)?;
    check_base(to_base)?;
    let parsed = parse_to_digits(digits, from_base)?;
    Ok(render(&convert_digits(&parsed, from_base, to_base), to_base))
}

/// Decimal string to lowercase hex without `0x`.
///
/// Negative values are encoded as two's complement `2^bit_width + value`
/// (`bit_width` defaults to 32).
pub fn decimal_to_hex(value: &str, bit_width: Option<u32>) -> Result<String, InputError> {
    let value = value.trim();
    let bits = bit_width.unwrap_or(DEFAULT_BIT_WIDTH);

    let Some(magnitude) = value.strip_prefix('-') else {
        return try_convert_base(value, 10, 16);
    };

    check_bit_width(bits)?;
    if magnitude.is_empty() {
        return Err(InputError::InvalidDigit { digit: '-', base: 10 });
    }

    let magnitude = convert_digits(&parse_to_digits(magnitude, 10)?, 10, 16);
    if magnitude.is_empty() {
        return Ok("0".to_string());
    }

    let modulus = pow2(bits, 16);
    if compare(&magnitude, &modulus) == Ordering::Greater {
        return Err(InputError::OutOfRange {
            value: value.to_string(),
            bits,
        });
    }

    Ok(render(&sub(&modulus, &magnitude, 16), 16))
}

/// Hex string (optional `0x`) to decimal string.
///
/// With `bit_width`, an unsigned value above `2^bit_width / 2` saturates to
/// `2^bit_width` instead of being read as a negative number.
pub fn hex_to_decimal(hex: &str, bit_width: Option<u32>) -> Result<String, InputError> {
    let hex = strip_hex_prefix(hex.trim());
    let value = convert_digits(&parse_to_digits(hex, 16)?, 16, 10);

    let Some(bits) = bit_width else {
        return Ok(render(&value, 10));
    };
    check_bit_width(bits)?;

    let half = pow2(bits - 1, 10);
    if compare(&value, &half) == Ordering::Greater {
        Ok(render(&pow2(bits, 10), 10))
    } else {
        Ok(render(&value, 10))
    }
}

/// Hex quantity to `u64`, for block numbers and timestamps
pub fn hex_to_u64(hex: &str) -> Result<u64, InputError> {
    let decimal = hex_to_decimal(hex, None)?;
    decimal.parse().map_err(|_| InputError::OutOfRange {
        value: hex.to_string(),
        bits: 64,
    })
}

/// `0x`-prefixed hex block height for JSON-RPC filters
pub fn block_to_hex(block: u64) -> String {
    let mut digits = Vec::new();
    let mut rest = block;
    while rest > 0 {
        digits.push((rest % 10) as u32);
        rest /= 10;
    }
    format!("0x{}", render(&convert_digits(&digits, 10, 16), 16))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn check_bit_width(bits: u32) -> Result<(), InputError> {
    if (1..=MAX_BIT_WIDTH).contains(&bits) {
        Ok(())
    } else {
        Err(InputError::InvalidBitWidth(bits))
    }
}

fn check_base(base: u32) -> Result<(), InputError> {
    if (2..=36).contains(&base) {
        Ok(())
    } else {
        Err(InputError::InvalidBase(base))
    }
}

fn parse_to_digits(s: &str, base: u32) -> Result<Digits, InputError> {
    s.chars()
        .rev()
        .map(|c| c.to_digit(base).ok_or(InputError::InvalidDigit { digit: c, base }))
        .collect()
}

fn convert_digits(digits: &[u32], from_base: u32, to_base: u32) -> Digits {
    let mut out = Vec::new();
    let mut power = vec![1];
    for &digit in digits {
        if digit != 0 {
            out = add(&out, &multiply_by_number(digit, &power, to_base), to_base);
        }
        power = multiply_by_number(from_base, &power, to_base);
    }
    out
}

fn render(digits: &[u32], base: u32) -> String {
    let rendered: String = digits
        .iter()
        .rev()
        .skip_while(|&&d| d == 0)
        .filter_map(|&d| char::from_digit(d, base))
        .collect();
    if rendered.is_empty() {
        "0".to_string()
    } else {
        rendered
    }
}

fn add(x: &[u32], y: &[u32], base: u32) -> Digits {
    let n = x.len().max(y.len());
    let mut z = Vec::with_capacity(n + 1);
    let mut carry = 0;
    let mut i = 0;
    while i < n || carry > 0 {
        let zi = carry + x.get(i).copied().unwrap_or(0) + y.get(i).copied().unwrap_or(0);
        z.push(zi % base);
        carry = zi / base;
        i += 1;
    }
    z
}

/// `num * x` by binary doubling
fn multiply_by_number(mut num: u32, x: &[u32], base: u32) -> Digits {
    let mut result = Vec::new();
    if num == 0 {
        return result;
    }
    let mut power = x.to_vec();
    loop {
        if num & 1 == 1 {
            result = add(&result, &power, base);
        }
        num >>= 1;
        if num == 0 {
            break;
        }
        power = add(&power, &power, base);
    }
    result
}

/// `x - y`, requires `x >= y`
fn sub(x: &[u32], y: &[u32], base: u32) -> Digits {
    let mut z = Vec::with_capacity(x.len());
    let mut borrow = 0;
    for (i, &xi) in x.iter().enumerate() {
        let subtrahend = y.get(i).copied().unwrap_or(0) + borrow;
        if xi >= subtrahend {
            z.push(xi - subtrahend);
            borrow = 0;
        } else {
            z.push(xi + base - subtrahend);
            borrow = 1;
        }
    }
    trim(z)
}

fn pow2(bits: u32, base: u32) -> Digits {
    let mut p = vec![1];
    for _ in 0..bits {
        p = add(&p, &p, base);
    }
    p
}

fn trim(mut digits: Digits) -> Digits {
    while digits.last() == Some(&0) {
        digits.pop();
    }
    digits
}

fn compare(x: &[u32], y: &[u32]) -> Ordering {
    let x = &x[..x.iter().rposition(|&d| d != 0).map_or(0, |i| i + 1)];
    let y = &y[..y.iter().rposition(|&d| d != 0).map_or(0, |i| i + 1)];
    x.len()
        .cmp(&y.len())
        .then_with(|| x.iter().rev().cmp(y.iter().rev()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const U256_MAX_DEC: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn test_decimal_to_hex() {
        assert_eq!(decimal_to_hex("0", None).unwrap(), "0");
        assert_eq!(decimal_to_hex("255", None).unwrap(), "ff");
        assert_eq!(decimal_to_hex("1000000", None).unwrap(), "f4240");
        assert_eq!(
            decimal_to_hex("18446744073709551616", None).unwrap(),
            "10000000000000000"
        );
        assert_eq!(decimal_to_hex(U256_MAX_DEC, None).unwrap(), "f".repeat(64));
    }

    #[test]
    fn test_negative_twos_complement() {
        assert_eq!(decimal_to_hex("-1", None).unwrap(), "ffffffff");
        assert_eq!(decimal_to_hex("-1", Some(8)).unwrap(), "ff");
        assert_eq!(decimal_to_hex("-128", Some(8)).unwrap(), "80");
        assert_eq!(decimal_to_hex("-256", Some(8)).unwrap(), "0");
        assert_eq!(decimal_to_hex("-0", None).unwrap(), "0");
        // 2^64 - 5
        assert_eq!(
            decimal_to_hex("-5", Some(64)).unwrap(),
            "fffffffffffffffb"
        );
        assert_eq!(decimal_to_hex("-1", Some(256)).unwrap(), "f".repeat(64));
    }

    #[test]
    fn test_negative_out_of_range() {
        let err = decimal_to_hex("-257", Some(8)).unwrap_err();
        assert!(matches!(err, InputError::OutOfRange { bits: 8, .. }));
        assert_eq!(
            decimal_to_hex("-1", Some(0)).unwrap_err(),
            InputError::InvalidBitWidth(0)
        );
    }

    #[test]
    fn test_bit_width_capped() {
        assert_eq!(
            hex_to_decimal("ff", Some(u32::MAX)).unwrap_err(),
            InputError::InvalidBitWidth(u32::MAX)
        );
        assert_eq!(
            decimal_to_hex("-1", Some(MAX_BIT_WIDTH + 1)).unwrap_err(),
            InputError::InvalidBitWidth(MAX_BIT_WIDTH + 1)
        );
        assert_eq!(hex_to_decimal("ff", Some(0)).unwrap_err(), InputError::InvalidBitWidth(0));

        // The cap itself is still accepted
        assert_eq!(
            decimal_to_hex("-1", Some(MAX_BIT_WIDTH)).unwrap(),
            "f".repeat((MAX_BIT_WIDTH / 4) as usize)
        );
        assert_eq!(hex_to_decimal("ff", Some(MAX_BIT_WIDTH)).unwrap(), "255");
    }

    #[test]
    fn test_hex_to_decimal() {
        assert_eq!(hex_to_decimal("0xff", None).unwrap(), "255");
        assert_eq!(hex_to_decimal("FF", None).unwrap(), "255");
        assert_eq!(hex_to_decimal("0x", None).unwrap(), "0");
        assert_eq!(hex_to_decimal("0x00ff", None).unwrap(), "255");
        assert_eq!(hex_to_decimal(&"f".repeat(64), None).unwrap(), U256_MAX_DEC);
    }

    #[test]
    fn test_hex_to_decimal_saturates_above_half() {
        assert_eq!(hex_to_decimal("7f", Some(8)).unwrap(), "127");
        assert_eq!(hex_to_decimal("80", Some(8)).unwrap(), "128");
        assert_eq!(hex_to_decimal("81", Some(8)).unwrap(), "256");
        assert_eq!(hex_to_decimal("0xffffffff", Some(32)).unwrap(), "4294967296");
    }

    #[test]
    fn test_invalid_digits() {
        assert_eq!(
            hex_to_decimal("0xzz", None).unwrap_err(),
            InputError::InvalidDigit { digit: 'z', base: 16 }
        );
        assert_eq!(
            decimal_to_hex("12a", None).unwrap_err(),
            InputError::InvalidDigit { digit: 'a', base: 10 }
        );
        assert_eq!(convert_base("1.5", 10, 16), None);
        assert_eq!(convert_base("12", 10, 37), None);
    }

    #[test]
    fn test_convert_base() {
        assert_eq!(convert_base("255", 10, 2).as_deref(), Some("11111111"));
        assert_eq!(convert_base("11111111", 2, 16).as_deref(), Some("ff"));
        assert_eq!(convert_base("zz", 36, 10).as_deref(), Some("1295"));
        assert_eq!(convert_base("", 10, 16).as_deref(), Some("0"));
    }

    #[test]
    fn test_round_trips() {
        for s in [
            "1",
            "9",
            "10",
            "4294967295",
            "9007199254740993",
            "123456789012345678901234567890",
            U256_MAX_DEC,
        ] {
            let hex = convert_base(s, 10, 16).unwrap();
            assert_eq!(convert_base(&hex, 16, 10).unwrap(), s);

            let hex = decimal_to_hex(s, None).unwrap();
            assert_eq!(hex_to_decimal(&hex, None).unwrap(), s);
        }
    }

    #[test]
    fn test_block_to_hex() {
        assert_eq!(block_to_hex(0), "0x0");
        assert_eq!(block_to_hex(4_000_000), "0x3d0900");
        assert_eq!(block_to_hex(u64::MAX), "0xffffffffffffffff");
        assert_eq!(hex_to_u64("0x3d0900").unwrap(), 4_000_000);
        assert!(hex_to_u64("0x10000000000000000").is_err());
    }
}
