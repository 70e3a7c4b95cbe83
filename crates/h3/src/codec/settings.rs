//! SETTINGS frame payload (RFC 9114 §7.2.4).

use bytes::BufMut;

use crate::varint::{decode_varint, encode_varint, varint_len};

pub const SETTINGS_QPACK_MAX_TABLE_CAPACITY: u64 = 0x01;
pub const SETTINGS_MAX_FIELD_SECTION_SIZE: u64 = 0x06;
pub const SETTINGS_QPACK_BLOCKED_STREAMS: u64 = 0x07;

/// An ordered mapping of setting identifier to value, kept in wire order.
///
/// Unknown identifiers are preserved so that a decoded frame re-encodes to the
/// same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(u64, u64)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `id`, or `None` when the peer did not send it.
    pub fn get(&self, id: u64) -> Option<u64> {
        self.entries.iter().find(|(key, _)| *key == id).map(|(_, value)| *value)
    }

    /// Sets `id` to `value`, keeping its position if it is already present.
    pub fn set(&mut self, id: u64, value: u64) -> &mut Self {
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `SETTINGS_QPACK_MAX_TABLE_CAPACITY`, 0 when absent.
    pub fn qpack_max_table_capacity(&self) -> u64 {
        self.get(SETTINGS_QPACK_MAX_TABLE_CAPACITY).unwrap_or(0)
    }

    /// `SETTINGS_MAX_FIELD_SECTION_SIZE`, `None` (unlimited) when absent.
    pub fn max_field_section_size(&self) -> Option<u64> {
        self.get(SETTINGS_MAX_FIELD_SECTION_SIZE)
    }

    /// `SETTINGS_QPACK_BLOCKED_STREAMS`, 0 when absent.
    pub fn qpack_blocked_streams(&self) -> u64 {
        self.get(SETTINGS_QPACK_BLOCKED_STREAMS).unwrap_or(0)
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.entries.iter().map(|(id, value)| varint_len(*id) + varint_len(*value)).sum()
    }

    pub(crate) fn encode<B: BufMut>(&self, dst: &mut B) {
        for (id, value) in &self.entries {
            encode_varint(*id, dst);
            encode_varint(*value, dst);
        }
    }

    /// Parses `(id, value)` varint pairs until the payload is exhausted.
    ///
    /// Returns `None` when the payload ends in the middle of a pair.
    pub(crate) fn decode(mut payload: &[u8]) -> Option<Self> {
        let mut settings = Settings::new();
        while !payload.is_empty() {
            let (id, n) = decode_varint(payload)?;
            payload = &payload[n..];
            let (value, n) = decode_varint(payload)?;
            payload = &payload[n..];
            settings.entries.push((id, value));
        }
        Some(settings)
    }
}

impl FromIterator<(u64, u64)> for Settings {
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        let mut settings = Settings::new();
        for (id, value) in iter {
            settings.set(id, value);
        }
        settings
    }
}
