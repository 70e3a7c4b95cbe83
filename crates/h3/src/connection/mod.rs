//! Stream level drivers for HTTP/3.
//!
//! - [`H3StreamConnection`]: reads one request from a bidirectional request
//!   stream, calls a [`Handler`](crate::handler::Handler) and writes the response
//! - [`ControlStream`] / [`PeerControlStream`]: the local and remote control
//!   streams carrying SETTINGS and GOAWAY
//!
//! The QUIC transport that hands over the stream halves is not part of this crate.

mod control;
mod stream_connection;

pub use control::{ControlStream, PeerControlStream, STREAM_TYPE_CONTROL, read_peer_settings};
pub use stream_connection::H3StreamConnection;
