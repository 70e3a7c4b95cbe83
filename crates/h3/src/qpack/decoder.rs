//! QPACK field section decoder.
//!
//! The first byte of every field line selects its representation
//! (RFC 9204 §4.5):
//!
//! | pattern    | representation                                 |
//! |------------|------------------------------------------------|
//! | `1Txxxxxx` | Indexed Field Line                             |
//! | `01NTxxxx` | Literal With Name Reference                    |
//! | `001NHxxx` | Literal With Literal Name                      |
//! | `0001xxxx` | Indexed Field Line With Post-Base Index        |
//! | `0000Nxxx` | Literal With Post-Base Name Reference          |
//!
//! `T` clear and both post-base forms address the dynamic table, which this
//! decoder never populates, so those lines always miss. Every representation
//! consumes at least its first byte, and no read goes past the end of the
//! block.

use bytes::Bytes;
use tracing::{trace, warn};

use crate::protocol::QpackError;
use crate::qpack::{huffman, static_table, DecodePolicy, HeaderField};
use crate::varint::decode_prefix_int;

#[derive(Debug, Clone, Default)]
pub struct QpackDecoder {
    max_table_capacity: u64,
    policy: DecodePolicy,
}

impl QpackDecoder {
    pub fn new(max_table_capacity: u64, policy: DecodePolicy) -> Self {
        Self { max_table_capacity, policy }
    }

    pub fn max_table_capacity(&self) -> u64 {
        self.max_table_capacity
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Decodes one field section, the payload of a HEADERS frame.
    ///
    /// An empty block decodes to an empty list.
    ///
    /// # Errors
    ///
    /// Only with [`DecodePolicy::Strict`]: returns the first [`QpackError`]
    /// met. With [`DecodePolicy::Lenient`] unresolvable lines are dropped and a
    /// truncated section returns what was decoded before the truncation.
    pub fn decode(&mut self, block: &Bytes) -> Result<Vec<HeaderField>, QpackError> {
        let mut fields = Vec::new();
        if block.is_empty() {
            return Ok(fields);
        }

        let mut lines = FieldLines { block, pos: 0 };

        let required_insert_count = match lines.section_prefix() {
            Ok(count) => count,
            Err(e) => return self.truncated(e, fields),
        };
        if required_insert_count != 0 {
            self.skip_line(QpackError::DynamicTableDisabled(required_insert_count))?;
        }

        while lines.has_remaining() {
            match lines.next_field() {
                Ok(field) => fields.push(field),
                Err(e @ QpackError::Truncated { .. }) => return self.truncated(e, fields),
                Err(e) => self.skip_line(e)?,
            }
        }

        trace!(count = fields.len(), "decoded field section");
        Ok(fields)
    }

    fn skip_line(&self, e: QpackError) -> Result<(), QpackError> {
        match self.policy {
            DecodePolicy::Strict => Err(e),
            DecodePolicy::Lenient => {
                warn!(cause = %e, "skipping unresolvable field line");
                Ok(())
            }
        }
    }

    fn truncated(&self, e: QpackError, fields: Vec<HeaderField>) -> Result<Vec<HeaderField>, QpackError> {
        match self.policy {
            DecodePolicy::Strict => Err(e),
            DecodePolicy::Lenient => {
                warn!(cause = %e, decoded = fields.len(), "field section truncated, keeping decoded fields");
                Ok(fields)
            }
        }
    }
}

/// Cursor over the field lines of one section.
struct FieldLines<'a> {
    block: &'a Bytes,
    pos: usize,
}

/// A string literal as it appeared on the wire.
struct RawString {
    bytes: Bytes,
    huffman: bool,
    offset: usize,
}

impl RawString {
    fn decode(self) -> Result<Bytes, QpackError> {
        if !self.huffman {
            return Ok(self.bytes);
        }
        huffman::decode(&self.bytes).map(Bytes::from).map_err(|_invalid| QpackError::InvalidHuffman { offset: self.offset })
    }
}

impl FieldLines<'_> {
    #[inline]
    fn has_remaining(&self) -> bool {
        self.pos < self.block.len()
    }

    fn truncated(&self) -> QpackError {
        QpackError::Truncated { offset: self.pos }
    }

    fn prefix_int(&mut self, prefix_bits: u8) -> Result<u64, QpackError> {
        let (value, consumed) = decode_prefix_int(&self.block[self.pos..], prefix_bits).ok_or_else(|| self.truncated())?;
        self.pos += consumed;
        Ok(value)
    }

    /// Reads a string whose length uses a `prefix_bits` prefix, with the
    /// Huffman flag in the bit just above the prefix.
    fn string(&mut self, prefix_bits: u8) -> Result<RawString, QpackError> {
        let offset = self.pos;
        let huffman = self.block.get(self.pos).is_some_and(|b| b & (1 << prefix_bits) != 0);
        let len = self.prefix_int(prefix_bits)?;

        let end = usize::try_from(len).ok().and_then(|len| self.pos.checked_add(len)).filter(|end| *end <= self.block.len());
        let Some(end) = end else {
            return Err(self.truncated());
        };

        let bytes = self.block.slice(self.pos..end);
        self.pos = end;
        Ok(RawString { bytes, huffman, offset })
    }

    /// Reads the Required Insert Count and the Base.
    fn section_prefix(&mut self) -> Result<u64, QpackError> {
        let required_insert_count = self.prefix_int(8)?;
        if !self.has_remaining() {
            return Err(self.truncated());
        }
        let _delta_base = self.prefix_int(7)?;
        Ok(required_insert_count)
    }

    /// Decodes the next field line. When this returns anything but
    /// [`QpackError::Truncated`], the whole line has been consumed.
    fn next_field(&mut self) -> Result<HeaderField, QpackError> {
        let first = self.block[self.pos];

        if first & 0x80 != 0 {
            let is_static = first & 0x40 != 0;
            let index = self.prefix_int(6)?;
            let (name, value) = lookup(is_static, index)?;
            Ok(HeaderField::from_static(name, value))
        } else if first & 0x40 != 0 {
            let is_static = first & 0x10 != 0;
            let index = self.prefix_int(4)?;
            let value = self.string(7)?;
            let (name, _) = lookup(is_static, index)?;
            Ok(HeaderField::new(Bytes::from_static(name), value.decode()?))
        } else if first & 0x20 != 0 {
            let name = self.string(3)?;
            let value = self.string(7)?;
            Ok(HeaderField::new(name.decode()?, value.decode()?))
        } else if first & 0x10 != 0 {
            let index = self.prefix_int(4)?;
            Err(QpackError::missing_dynamic(index))
        } else {
            let index = self.prefix_int(3)?;
            let _value = self.string(7)?;
            Err(QpackError::missing_dynamic(index))
        }
    }
}

/// Resolves a table reference. The dynamic table is never populated.
fn lookup(is_static: bool, index: u64) -> Result<(&'static [u8], &'static [u8]), QpackError> {
    if !is_static {
        return Err(QpackError::missing_dynamic(index));
    }
    static_table::get(index).ok_or(QpackError::missing_static(index))
}
