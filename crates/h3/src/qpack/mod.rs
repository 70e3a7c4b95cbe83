//! QPACK field compression ([RFC 9204]), static table only.
//!
//! The encoder only ever references the static table and never emits Huffman
//! strings. The decoder accepts everything a peer may send in a field section,
//! including Huffman-coded strings, but has no dynamic table: any reference to
//! it resolves to "no entry" and is handled according to the configured
//! [`DecodePolicy`].
//!
//! Encoder and decoder instances carry per-session state (the configured
//! table capacity) and take `&mut self`; create one pair per stream session
//! rather than sharing them. The [`static_table`] is plain constant data.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_h3::qpack::{HeaderField, QpackDecoder, QpackEncoder};
//!
//! let fields = vec![HeaderField::new(":method", "GET"), HeaderField::new("x-request-id", "42")];
//!
//! let mut block = BytesMut::new();
//! QpackEncoder::default().encode(&fields, &mut block);
//!
//! let decoded = QpackDecoder::default().decode(&block.freeze()).unwrap();
//! assert_eq!(decoded, fields);
//! ```
//!
//! [RFC 9204]: https://www.rfc-editor.org/rfc/rfc9204.html

mod decoder;
mod encoder;
pub mod huffman;
pub mod static_table;

pub use decoder::QpackDecoder;
pub use encoder::QpackEncoder;

use bytes::Bytes;

/// Per-entry overhead used when sizing a field section (RFC 9204 §3.2.1).
const ENTRY_OVERHEAD: u64 = 32;

/// A single header field line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderField {
    name: Bytes,
    value: Bytes,
}

impl HeaderField {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub(crate) fn from_static(name: &'static [u8], value: &'static [u8]) -> Self {
        Self { name: Bytes::from_static(name), value: Bytes::from_static(value) }
    }

    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns true for `:method`, `:path`, `:status` and the other pseudo-header fields.
    #[inline]
    pub fn is_pseudo(&self) -> bool {
        self.name.first() == Some(&b':')
    }

    /// Size of this field as counted against `SETTINGS_MAX_FIELD_SECTION_SIZE`.
    #[inline]
    pub fn size(&self) -> u64 {
        self.name.len() as u64 + self.value.len() as u64 + ENTRY_OVERHEAD
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.name, self.value)
    }
}

/// What the decoder does with a field line it cannot resolve.
///
/// A line is unresolvable when it references a table entry that does not exist
/// (any dynamic table reference, or a static index past the end of the table)
/// or carries an invalid Huffman string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Drop the offending field line with a warning and keep decoding. A
    /// truncated section yields the fields decoded before the truncation.
    #[default]
    Lenient,
    /// Fail the whole field section with `QPACK_DECOMPRESSION_FAILED`
    /// semantics, as RFC 9204 §2.2.3 requires.
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_fields() {
        assert!(HeaderField::new(":path", "/").is_pseudo());
        assert!(!HeaderField::new("content-type", "text/plain").is_pseudo());
        assert!(!HeaderField::new("", "").is_pseudo());
    }

    #[test]
    fn field_size_includes_overhead() {
        assert_eq!(HeaderField::new("ab", "cde").size(), 37);
    }
}
