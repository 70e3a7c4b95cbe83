//! Integer encodings used on the HTTP/3 wire.
//!
//! Two unrelated forms live here:
//!
//! - QUIC variable-length integers ([RFC 9000 §16]): the two high bits of the
//!   first byte select a width of 1, 2, 4 or 8 bytes. Used for frame types,
//!   frame lengths and SETTINGS pairs.
//! - N-bit prefix integers ([RFC 7541 §5.1], reused by QPACK): the value is
//!   stored in the low N bits of the first byte, or the prefix is saturated and
//!   the excess follows in 7-bit continuation bytes. Used inside QPACK field
//!   lines.
//!
//! The two are not interchangeable.
//!
//! [RFC 9000 §16]: https://www.rfc-editor.org/rfc/rfc9000.html#section-16
//! [RFC 7541 §5.1]: https://www.rfc-editor.org/rfc/rfc7541.html#section-5.1

use bytes::BufMut;

use crate::ensure;
use crate::protocol::VarintError;

/// Largest value representable by a QUIC varint (2^62 - 1).
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// Returns the encoded byte length of `value` as a QUIC varint (1, 2, 4 or 8).
#[inline]
pub fn varint_len(value: u64) -> usize {
    if value < (1 << 6) {
        1
    } else if value < (1 << 14) {
        2
    } else if value < (1 << 30) {
        4
    } else {
        8
    }
}

/// Encodes `value` as a QUIC varint using the smallest width that fits.
///
/// # Errors
///
/// Returns [`VarintError::Overflow`] when `value` exceeds [`MAX_VARINT`].
pub fn try_encode_varint<B: BufMut>(value: u64, dst: &mut B) -> Result<(), VarintError> {
    ensure!(value <= MAX_VARINT, VarintError::Overflow(value));

    match varint_len(value) {
        1 => dst.put_u8(value as u8),
        2 => dst.put_u16(0x4000 | value as u16),
        4 => dst.put_u32(0x8000_0000 | value as u32),
        _ => dst.put_u64(0xc000_0000_0000_0000 | value),
    }
    Ok(())
}

/// Encodes `value` as a QUIC varint.
///
/// # Panics
///
/// Panics when `value` exceeds [`MAX_VARINT`]; every length and type this crate
/// writes is bounded well below it, so hitting this is a caller bug.
pub fn encode_varint<B: BufMut>(value: u64, dst: &mut B) {
    if let Err(e) = try_encode_varint(value, dst) {
        panic!("{e}");
    }
}

/// Decodes a QUIC varint from the start of `buf`.
///
/// Returns `(value, bytes_consumed)`, or `None` when `buf` does not yet hold
/// the full width announced by the first byte. `None` means "wait for more
/// bytes", not corruption.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let first = *buf.first()?;
    let len = 1usize << (first >> 6);
    if buf.len() < len {
        return None;
    }

    let value = buf[1..len].iter().fold(u64::from(first & 0x3f), |acc, b| (acc << 8) | u64::from(*b));
    Some((value, len))
}

/// Encodes `value` as an N-bit prefix integer.
///
/// `pattern` supplies the bits above the prefix in the first byte (for
/// example `0xc0` for a static indexed field line); its low `prefix_bits` bits
/// must be zero.
pub fn encode_prefix_int<B: BufMut>(value: u64, prefix_bits: u8, pattern: u8, dst: &mut B) {
    debug_assert!((1..=8).contains(&prefix_bits), "prefix width out of range");
    let max = (1u64 << prefix_bits) - 1;

    if value < max {
        dst.put_u8(pattern | value as u8);
        return;
    }

    dst.put_u8(pattern | max as u8);
    let mut remaining = value - max;
    while remaining >= 0x80 {
        dst.put_u8(0x80 | (remaining & 0x7f) as u8);
        remaining >>= 7;
    }
    dst.put_u8(remaining as u8);
}

/// Decodes an N-bit prefix integer from the start of `buf`, ignoring the bits
/// above the prefix.
///
/// Returns `(value, bytes_consumed)`, or `None` when the continuation bytes
/// run past the end of `buf` or the value would not fit in 62 bits.
pub fn decode_prefix_int(buf: &[u8], prefix_bits: u8) -> Option<(u64, usize)> {
    debug_assert!((1..=8).contains(&prefix_bits), "prefix width out of range");
    let max = (1u64 << prefix_bits) - 1;

    let value = u64::from(*buf.first()?) & max;
    if value < max {
        return Some((value, 1));
    }

    let mut value = max;
    let mut shift = 0u32;
    for (i, b) in buf[1..].iter().enumerate() {
        if shift > 56 {
            return None;
        }
        value = value.checked_add(u64::from(b & 0x7f) << shift)?;
        if b & 0x80 == 0 {
            return (value <= MAX_VARINT).then_some((value, i + 2));
        }
        shift += 7;
    }

    None
}
