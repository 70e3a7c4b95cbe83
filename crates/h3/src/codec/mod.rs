//! HTTP/3 frame codec.
//!
//! Frames are `varint(type) || varint(length) || payload` (RFC 9114 §7.1).
//! The module offers two ways of getting them off the wire:
//!
//! - [`parse_frames`]: a one-shot parse of a byte slice, returning the frames
//!   found and the unconsumed remainder
//! - [`FrameDecoder`] / [`FrameEncoder`]: `tokio_util` codecs for use with
//!   `FramedRead` and `FramedWrite` on a stream
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_h3::codec::{parse_frames, Frame};
//!
//! let mut wire = Frame::Data(Bytes::from_static(b"hello")).to_bytes().to_vec();
//! wire.extend_from_slice(&[0x01, 0x05]); // HEADERS with its payload still missing
//!
//! let parsed = parse_frames(&wire);
//! assert_eq!(parsed.frames, vec![Frame::Data(Bytes::from_static(b"hello"))]);
//! assert_eq!(&parsed.remainder[..], &[0x01, 0x05]);
//! ```

mod frame;
mod frame_decoder;
mod frame_encoder;
mod settings;

pub use frame::{
    FRAME_CANCEL_PUSH, FRAME_DATA, FRAME_GOAWAY, FRAME_HEADERS, FRAME_MAX_PUSH_ID, FRAME_PUSH_PROMISE, FRAME_SETTINGS, Frame,
};
pub use frame_decoder::{FrameDecoder, ParsedFrames, parse_frames};
pub use frame_encoder::FrameEncoder;
pub use settings::{SETTINGS_MAX_FIELD_SECTION_SIZE, SETTINGS_QPACK_BLOCKED_STREAMS, SETTINGS_QPACK_MAX_TABLE_CAPACITY, Settings};
