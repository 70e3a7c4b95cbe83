//! QPACK field section encoder.
//!
//! Each field is written with the most compact static-table representation
//! available (RFC 9204 §4.5):
//!
//! | match in static table | field line                       | first byte |
//! |-----------------------|----------------------------------|------------|
//! | name and value        | Indexed Field Line               | `11xxxxxx` |
//! | name only             | Literal With Name Reference      | `0101xxxx` |
//! | none                  | Literal With Literal Name        | `0010xxxx` |
//!
//! Strings are always written raw, with the Huffman flag clear.

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::qpack::HeaderField;
use crate::qpack::static_table::{self, TableMatch};
use crate::varint::encode_prefix_int;

/// Indexed field line referencing the static table: `1` + `T=1`.
const INDEXED_STATIC: u8 = 0xc0;
/// Literal with name reference to the static table: `01` + `N=0` + `T=1`.
const LITERAL_STATIC_NAME_REF: u8 = 0x50;
/// Literal with literal name: `001` + `N=0` + `H=0`.
const LITERAL_LITERAL_NAME: u8 = 0x20;

#[derive(Debug, Clone, Default)]
pub struct QpackEncoder {
    max_table_capacity: u64,
}

impl QpackEncoder {
    /// Creates an encoder for a session that advertised `max_table_capacity`.
    ///
    /// The capacity is recorded but no dynamic table entries are ever inserted.
    pub fn new(max_table_capacity: u64) -> Self {
        Self { max_table_capacity }
    }

    pub fn max_table_capacity(&self) -> u64 {
        self.max_table_capacity
    }

    /// Encodes `fields` in order as one field section appended to `dst`.
    ///
    /// An empty field list produces no bytes at all.
    pub fn encode(&mut self, fields: &[HeaderField], dst: &mut BytesMut) {
        if fields.is_empty() {
            return;
        }

        // Required Insert Count = 0, then Sign = 0 and Delta Base = 0
        dst.put_u8(0x00);
        dst.put_u8(0x00);

        for field in fields {
            let name = lowercase(field.name());
            encode_field_line(&name, field.value(), dst);
        }
    }

    pub fn encode_to_bytes(&mut self, fields: &[HeaderField]) -> Bytes {
        let mut dst = BytesMut::with_capacity(encoded_len_hint(fields));
        self.encode(fields, &mut dst);
        dst.freeze()
    }
}

fn encode_field_line(name: &[u8], value: &[u8], dst: &mut BytesMut) {
    match static_table::find(name, value) {
        TableMatch::Full(index) => {
            trace!(index, "indexed field line");
            encode_prefix_int(index as u64, 6, INDEXED_STATIC, dst);
        }
        TableMatch::Name(index) => {
            trace!(index, "literal field line with name reference");
            encode_prefix_int(index as u64, 4, LITERAL_STATIC_NAME_REF, dst);
            encode_string(value, dst);
        }
        TableMatch::None => {
            encode_prefix_int(name.len() as u64, 3, LITERAL_LITERAL_NAME, dst);
            dst.put_slice(name);
            encode_string(value, dst);
        }
    }
}

/// Writes a string literal with a 7-bit length prefix and the H bit clear.
fn encode_string(value: &[u8], dst: &mut BytesMut) {
    encode_prefix_int(value.len() as u64, 7, 0x00, dst);
    dst.put_slice(value);
}

fn lowercase(name: &[u8]) -> Cow<'_, [u8]> {
    if name.iter().any(u8::is_ascii_uppercase) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

/// Upper bound guess for the encoded size: literal everything.
fn encoded_len_hint(fields: &[HeaderField]) -> usize {
    2 + fields.iter().map(|f| f.name().len() + f.value().len() + 4).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(fields: &[HeaderField]) -> Vec<u8> {
        QpackEncoder::default().encode_to_bytes(fields).to_vec()
    }

    #[test]
    fn empty_list_encodes_to_nothing() {
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn indexed_field_lines() {
        let bytes = encode(&[HeaderField::new(":method", "GET"), HeaderField::new(":path", "/")]);
        assert_eq!(bytes, vec![0x00, 0x00, 0xd1, 0xc1]);
    }

    #[test]
    fn indexed_field_line_past_prefix() {
        // :status 500 is entry 71, beyond the 6-bit prefix
        let bytes = encode(&[HeaderField::new(":status", "500")]);
        assert_eq!(bytes, vec![0x00, 0x00, 0xff, 0x08]);
    }

    #[test]
    fn name_reference() {
        let bytes = encode(&[HeaderField::new(":path", "/index.html")]);
        let mut expected = vec![0x00, 0x00, 0x51, 0x0b];
        expected.extend_from_slice(b"/index.html");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn name_reference_past_prefix() {
        // content-type is first found at entry 44
        let bytes = encode(&[HeaderField::new("content-type", "text/xml")]);
        assert_eq!(&bytes[..5], &[0x00, 0x00, 0x5f, 0x1d, 0x08]);
        assert_eq!(&bytes[5..], b"text/xml");
    }

    #[test]
    fn literal_name() {
        let bytes = encode(&[HeaderField::new("x-custom", "value")]);
        // 8 bytes of name saturate the 3-bit prefix
        let mut expected = vec![0x00, 0x00, 0x27, 0x01];
        expected.extend_from_slice(b"x-custom");
        expected.push(0x05);
        expected.extend_from_slice(b"value");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn names_are_lowercased() {
        assert_eq!(encode(&[HeaderField::new("Content-Type", "application/json")]), encode(&[HeaderField::new("content-type", "application/json")]));
        assert_eq!(encode(&[HeaderField::new("X-Custom", "Value")])[4..12], *b"x-custom");
    }

    #[test]
    fn keeps_configured_capacity() {
        assert_eq!(QpackEncoder::new(4096).max_table_capacity(), 4096);
    }
}
