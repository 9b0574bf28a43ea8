//! Base-128 variable length integers, zig-zag encoding, and the double-precision safe-integer checks
//! used when a 64-bit value has to cross into a floating point representation.

use crate::io::read::{Error, Result};
use thiserror::Error;

/// The maximum number of bytes a 64-bit varint can use on the wire
pub const MAX_VARINT_LEN: usize = 10;

/// The largest integer an IEEE-754 double can hold such that it and every integer below it are exact (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// The smallest exactly representable integer in an IEEE-754 double, the negation of [`MAX_SAFE_INTEGER`]
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// The error returned when a 64-bit value cannot be represented exactly by a double.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
#[error("{value} cannot be represented exactly as a double-precision number")]
pub struct PrecisionLoss {
    /// The value that couldn't be converted
    pub value: f64,
}

/// Appends the varint encoding of `value` to the buffer, returning the number of bytes written.
///
/// # Examples
///
/// ```
/// use protwire::io::varint;
///
/// let mut buf = Vec::new();
/// assert_eq!(varint::encode_varint(300, &mut buf), 2);
/// assert_eq!(buf, [0xAC, 0x02]);
/// ```
#[inline]
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let mut written = 1;
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
        written += 1;
    }
    buf.push(value as u8);
    written
}

/// Decodes a varint from the start of the slice, returning the value and the number of bytes it used.
///
/// A varint that runs past the end of the slice is a [`TruncatedBuffer`](../read/enum.Error.html#variant.TruncatedBuffer) error.
/// A varint with more than 10 bytes, or whose 10th byte carries bits past the 64th, is a
/// [`MalformedVarint`](../read/enum.Error.html#variant.MalformedVarint) error.
#[inline]
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &b) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && b > 0x01 {
            return Err(Error::MalformedVarint);
        }
        value |= u64::from(b & 0x7F) << (7 * i);
        if b < 0x80 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(Error::MalformedVarint)
    } else {
        Err(Error::TruncatedBuffer { needed: buf.len() + 1, remaining: buf.len() })
    }
}

/// Zig-zag encodes a 32-bit value
#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Reverses [`zigzag_encode32`]
#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Zig-zag encodes a 64-bit value
#[inline]
pub const fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Reverses [`zigzag_encode64`]
#[inline]
pub const fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// The number of bytes `value` takes as a varint
#[inline]
pub const fn varint32_size(value: u32) -> usize {
    (((31 ^ (value | 1).leading_zeros()) * 9 + 73) / 64) as usize
}

/// The number of bytes `value` takes as a varint
#[inline]
pub const fn varint64_size(value: u64) -> usize {
    (((63 ^ (value | 1).leading_zeros()) * 9 + 73) / 64) as usize
}

/// Converts a signed 64-bit value to a double, failing if the conversion would round
pub fn i64_to_f64(value: i64) -> core::result::Result<f64, PrecisionLoss> {
    if (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        Ok(value as f64)
    } else {
        Err(PrecisionLoss { value: value as f64 })
    }
}

/// Converts an unsigned 64-bit value to a double, failing if the conversion would round
pub fn u64_to_f64(value: u64) -> core::result::Result<f64, PrecisionLoss> {
    if value <= MAX_SAFE_INTEGER as u64 {
        Ok(value as f64)
    } else {
        Err(PrecisionLoss { value: value as f64 })
    }
}

/// Converts a double holding an integer back to a signed 64-bit value.
///
/// Doubles outside the safe range are rejected even when they happen to be integral,
/// since a neighbouring integer may have been rounded to them.
pub fn f64_to_i64(value: f64) -> core::result::Result<i64, PrecisionLoss> {
    if value.fract() != 0.0 || !(MIN_SAFE_INTEGER as f64..=MAX_SAFE_INTEGER as f64).contains(&value) {
        Err(PrecisionLoss { value })
    } else {
        Ok(value as i64)
    }
}

/// Converts a double holding a non-negative integer back to an unsigned 64-bit value
pub fn f64_to_u64(value: f64) -> core::result::Result<u64, PrecisionLoss> {
    if value.fract() != 0.0 || !(0.0..=MAX_SAFE_INTEGER as f64).contains(&value) {
        Err(PrecisionLoss { value })
    } else {
        Ok(value as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn varint_encode() {
        fn try_encode(value: u64, bytes: &[u8]) {
            let mut output = Vec::new();
            let len = encode_varint(value, &mut output);

            assert_eq!(output, bytes);
            assert_eq!(len, bytes.len());
            assert_eq!(varint64_size(value), bytes.len());
        }

        try_encode(0, &[0x00]);
        try_encode(1, &[0x01]);
        try_encode(127, &[0x7F]);
        try_encode(128, &[0x80, 0x01]);
        try_encode(300, &[0xAC, 0x02]);
        try_encode(16_383, &[0xFF, 0x7F]);
        try_encode(2_097_151, &[0xFF, 0xFF, 0x7F]);
        try_encode(268_435_455, &[0xFF, 0xFF, 0xFF, 0x7F]);
        try_encode(u32::MAX as u64, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        try_encode(u64::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn varint_decode() {
        fn try_decode(bytes: &[u8], expected: u64) {
            assert_eq!(decode_varint(bytes).unwrap(), (expected, bytes.len()));
        }

        try_decode(&[0x00], 0);
        try_decode(&[0x7F], 127);
        try_decode(&[0xAC, 0x02], 300);
        try_decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], u32::MAX as u64);
        try_decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01], u64::MAX);
    }

    #[test]
    fn varint_decode_stops_at_terminator() {
        assert_eq!(decode_varint(&[0x96, 0x01, 0xFF, 0xFF]).unwrap(), (150, 2));
    }

    #[test]
    fn varint_overlong_is_malformed() {
        let eleven = [0xFF; 11];
        assert_matches!(decode_varint(&eleven), Err(Error::MalformedVarint));

        let overflow = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_matches!(decode_varint(&overflow), Err(Error::MalformedVarint));
    }

    #[test]
    fn varint_truncated() {
        assert_matches!(decode_varint(&[0x80, 0x80]), Err(Error::TruncatedBuffer { .. }));
        assert_matches!(decode_varint(&[]), Err(Error::TruncatedBuffer { .. }));
    }

    #[test]
    fn zigzag() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(-2), 3);
        assert_eq!(zigzag_encode32(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);

        assert_eq!(zigzag_encode64(-1), 1);
        assert_eq!(zigzag_encode64(i64::MIN), u64::MAX);

        for n in [0, 1, -1, 63, -64, i32::MAX, i32::MIN] {
            assert_eq!(zigzag_decode32(zigzag_encode32(n)), n);
        }
        for n in [0, 1, -1, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode64(zigzag_encode64(n)), n);
        }
    }

    #[test]
    fn sizes() {
        assert_eq!(varint32_size(0), 1);
        assert_eq!(varint32_size(127), 1);
        assert_eq!(varint32_size(128), 2);
        assert_eq!(varint32_size(u32::MAX), 5);
        assert_eq!(varint64_size(u64::MAX), 10);
    }

    #[test]
    fn safe_integer_boundary() {
        assert_eq!(i64_to_f64(MAX_SAFE_INTEGER), Ok(9_007_199_254_740_991.0));
        assert!(i64_to_f64(1 << 53).is_err());
        assert!(i64_to_f64(-(1 << 53)).is_err());
        assert!(u64_to_f64(1 << 53).is_err());

        assert_eq!(f64_to_i64(-42.0), Ok(-42));
        assert!(f64_to_i64(9_007_199_254_740_992.0).is_err());
        assert!(f64_to_i64(1.5).is_err());
        assert!(f64_to_u64(-1.0).is_err());
    }
}
