//! Per-session HTTP/3 settings.
//!
//! ```
//! use micro_h3::config::H3Config;
//! use micro_h3::qpack::DecodePolicy;
//!
//! let config = H3Config::builder()
//!     .max_field_section_size(16 * 1024)
//!     .decode_policy(DecodePolicy::Strict)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.settings().max_field_section_size(), Some(16 * 1024));
//! ```

use thiserror::Error;

use crate::codec::{SETTINGS_MAX_FIELD_SECTION_SIZE, Settings};
use crate::qpack::DecodePolicy;
use crate::varint::MAX_VARINT;

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;
const DEFAULT_MAX_FRAME_PAYLOAD_SIZE: u64 = 16 * 1024 * 1024;
const DEFAULT_MAX_REQUEST_BODY_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H3Config {
    qpack_max_table_capacity: u64,
    qpack_blocked_streams: u64,
    max_field_section_size: Option<u64>,
    max_frame_payload_size: u64,
    max_request_body_size: u64,
    decode_policy: DecodePolicy,
    read_buffer_size: usize,
}

impl H3Config {
    pub fn builder() -> H3ConfigBuilder {
        H3ConfigBuilder::new()
    }

    /// Capacity recorded by the QPACK encoder and decoder. Never advertised,
    /// the dynamic table is not implemented.
    pub fn qpack_max_table_capacity(&self) -> u64 {
        self.qpack_max_table_capacity
    }

    /// Recorded like [`qpack_max_table_capacity`](Self::qpack_max_table_capacity), never advertised.
    pub fn qpack_blocked_streams(&self) -> u64 {
        self.qpack_blocked_streams
    }

    /// Largest decoded field section accepted, `None` for no limit.
    pub fn max_field_section_size(&self) -> Option<u64> {
        self.max_field_section_size
    }

    pub fn max_frame_payload_size(&self) -> u64 {
        self.max_frame_payload_size
    }

    /// Largest total of DATA payloads accepted on one request stream.
    pub fn max_request_body_size(&self) -> u64 {
        self.max_request_body_size
    }

    pub fn decode_policy(&self) -> DecodePolicy {
        self.decode_policy
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// The SETTINGS this endpoint advertises. Values equal to the protocol
    /// defaults are left out.
    ///
    /// `SETTINGS_QPACK_MAX_TABLE_CAPACITY` and `SETTINGS_QPACK_BLOCKED_STREAMS`
    /// are always left at their default of 0 so that peers never reference a
    /// dynamic table entry, whatever capacity the codec records.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new();
        if let Some(size) = self.max_field_section_size {
            settings.set(SETTINGS_MAX_FIELD_SECTION_SIZE, size);
        }
        settings
    }
}

impl Default for H3Config {
    fn default() -> Self {
        Self {
            qpack_max_table_capacity: 0,
            qpack_blocked_streams: 0,
            max_field_section_size: None,
            max_frame_payload_size: DEFAULT_MAX_FRAME_PAYLOAD_SIZE,
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
            decode_policy: DecodePolicy::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct H3ConfigBuilder {
    config: H3Config,
}

impl H3ConfigBuilder {
    fn new() -> Self {
        Self { config: H3Config::default() }
    }

    pub fn qpack_max_table_capacity(mut self, capacity: u64) -> Self {
        self.config.qpack_max_table_capacity = capacity;
        self
    }

    pub fn qpack_blocked_streams(mut self, blocked_streams: u64) -> Self {
        self.config.qpack_blocked_streams = blocked_streams;
        self
    }

    pub fn max_field_section_size(mut self, size: u64) -> Self {
        self.config.max_field_section_size = Some(size);
        self
    }

    pub fn max_frame_payload_size(mut self, size: u64) -> Self {
        self.config.max_frame_payload_size = size;
        self
    }

    pub fn max_request_body_size(mut self, size: u64) -> Self {
        self.config.max_request_body_size = size;
        self
    }

    pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.config.decode_policy = policy;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    pub fn build(self) -> Result<H3Config, ConfigBuildError> {
        let config = self.config;
        if config.read_buffer_size == 0 {
            return Err(ConfigBuildError::ZeroReadBuffer);
        }

        let settings = [
            ("qpack_max_table_capacity", config.qpack_max_table_capacity),
            ("qpack_blocked_streams", config.qpack_blocked_streams),
            ("max_field_section_size", config.max_field_section_size.unwrap_or(0)),
        ];
        if let Some((name, value)) = settings.into_iter().find(|(_, value)| *value > MAX_VARINT) {
            return Err(ConfigBuildError::SettingOutOfRange { name, value });
        }

        Ok(config)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigBuildError {
    #[error("read buffer size must be greater than zero")]
    ZeroReadBuffer,
    #[error("{name} = {value} can't be sent as a varint")]
    SettingOutOfRange { name: &'static str, value: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{SETTINGS_QPACK_BLOCKED_STREAMS, SETTINGS_QPACK_MAX_TABLE_CAPACITY};

    #[test]
    fn defaults_send_no_settings() {
        let config = H3Config::builder().build().unwrap();
        assert_eq!(config, H3Config::default());
        assert!(config.settings().is_empty());
        assert_eq!(config.read_buffer_size(), 8 * 1024);
        assert_eq!(config.decode_policy(), DecodePolicy::Lenient);
    }

    #[test]
    fn settings_follow_builder() {
        let config = H3Config::builder().max_field_section_size(8192).max_request_body_size(1024).build().unwrap();

        let settings = config.settings();
        assert_eq!(settings.max_field_section_size(), Some(8192));
        assert_eq!(settings.len(), 1);
        assert_eq!(config.max_request_body_size(), 1024);
    }

    #[test]
    fn dynamic_table_is_never_advertised() {
        let config = H3Config::builder().qpack_max_table_capacity(4096).qpack_blocked_streams(16).build().unwrap();
        assert_eq!(config.qpack_max_table_capacity(), 4096);
        assert_eq!(config.qpack_blocked_streams(), 16);

        let settings = config.settings();
        assert_eq!(settings.get(SETTINGS_QPACK_MAX_TABLE_CAPACITY), None);
        assert_eq!(settings.get(SETTINGS_QPACK_BLOCKED_STREAMS), None);
        assert!(settings.iter().all(|(id, _)| id == SETTINGS_MAX_FIELD_SECTION_SIZE));
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(H3Config::builder().read_buffer_size(0).build(), Err(ConfigBuildError::ZeroReadBuffer));
        assert_eq!(
            H3Config::builder().max_field_section_size(u64::MAX).build(),
            Err(ConfigBuildError::SettingOutOfRange { name: "max_field_section_size", value: u64::MAX })
        );
    }
}
