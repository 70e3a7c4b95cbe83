//! HTTP message level types on top of the frame codec.
//!
//! - [`MessageAssembler`]: turns a stream's frames into `http::Request` /
//!   `http::Response` values and back
//! - Error types:
//!   - [`HttpError`]: top-level error returned by the connection driver
//!   - [`ParseError`]: failures on the receive path
//!   - [`SendError`]: failures on the send path
//!   - [`QpackError`]: field section decompression failures
//!   - [`VarintError`]: integers outside the varint range

mod assembler;
mod error;

pub use assembler::MessageAssembler;
pub use error::{HttpError, ParseError, QpackError, SendError, VarintError};
