use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("field section size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: u64, max_size: u64 },

    #[error("request body too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("frame type {frame_type:#x} payload of {payload_len} bytes exceed the limit {max_size}")]
    TooLargeFrame { frame_type: u64, payload_len: u64, max_size: u64 },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid :status pseudo header")]
    InvalidStatus,

    #[error("stream ended without a HEADERS frame")]
    MissingHeaders,

    #[error("control stream must start with SETTINGS, got frame type {frame_type:#x}")]
    MissingSettings { frame_type: u64 },

    #[error("unexpected stream type {0:#x}")]
    UnexpectedStreamType(u64),

    #[error("qpack error: {source}")]
    Qpack {
        #[from]
        source: QpackError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn too_large_frame(frame_type: u64, payload_len: u64, max_size: u64) -> Self {
        Self::TooLargeFrame { frame_type, payload_len, max_size }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn missing_settings(frame_type: u64) -> Self {
        Self::MissingSettings { frame_type }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("can't encode frame: {source}")]
    Varint {
        #[from]
        source: VarintError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Raised by the checked varint encoder.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    #[error("value {0} exceeds the varint range")]
    Overflow(u64),
}

/// QPACK decompression failure (`QPACK_DECOMPRESSION_FAILED`, RFC 9204 §6).
///
/// Only produced by a decoder running with [`DecodePolicy::Strict`](crate::qpack::DecodePolicy::Strict).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QpackError {
    #[error("field section truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("reference to absent {table} table entry {index}")]
    MissingEntry { table: &'static str, index: u64 },

    #[error("required insert count {0} but the dynamic table is disabled")]
    DynamicTableDisabled(u64),

    #[error("invalid huffman encoded string at offset {offset}")]
    InvalidHuffman { offset: usize },
}

impl QpackError {
    pub fn missing_static(index: u64) -> Self {
        Self::MissingEntry { table: "static", index }
    }

    pub fn missing_dynamic(index: u64) -> Self {
        Self::MissingEntry { table: "dynamic", index }
    }
}
