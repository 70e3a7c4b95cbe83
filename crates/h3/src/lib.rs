//! HTTP/3 framing and QPACK for the micro http toolkit
//!
//! This crate implements the HTTP/3 layer that sits between a QUIC transport
//! and request handlers: frame parsing and serialization, QPACK field
//! compression with the static table, and the assembly of frames into
//! `http::Request` / `http::Response` values. The QUIC transport itself
//! (connection setup, TLS, flow control) is provided by the caller, which hands
//! over stream halves implementing `AsyncRead` / `AsyncWrite`.
//!
//! # Features
//!
//! - QUIC variable-length integers and QPACK prefix integers
//! - Streaming frame parsing, tolerant of arbitrary chunk boundaries
//! - Unknown and reserved frame types passed through untouched
//! - QPACK encoding and decoding against the static table, with Huffman decoding
//! - Strict or lenient handling of unresolvable field lines
//! - A per-stream connection driver and control stream helpers
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use micro_h3::config::H3Config;
//! use micro_h3::connection::H3StreamConnection;
//! use micro_h3::handler::make_handler;
//! use tokio::io::{AsyncRead, AsyncWrite};
//! use tracing::{error, info};
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<String>, Infallible> {
//!     info!(path = request.uri().path(), body_len = request.body().len(), "handle request");
//!     Ok(Response::new("Hello World!\r\n".to_string()))
//! }
//!
//! // called by the transport for every bidirectional request stream it accepts
//! async fn serve_stream<R, W>(reader: R, writer: W, config: Arc<H3Config>)
//! where
//!     R: AsyncRead + Unpin,
//!     W: AsyncWrite + Unpin,
//! {
//!     let handler = Arc::new(make_handler(hello_world));
//!     let connection = H3StreamConnection::new(reader, writer, &config);
//!     match connection.process(handler).await {
//!         Ok(_) => info!("finished process, stream shutdown"),
//!         Err(e) => error!("service has error, cause {}, stream shutdown", e),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`varint`]: integer encodings shared by frames and QPACK
//! - [`qpack`]: field section compression
//! - [`codec`]: frame types, `parse_frames` and the `tokio_util` codecs
//! - [`protocol`]: [`MessageAssembler`](protocol::MessageAssembler) and error types
//! - [`config`]: per-session settings
//! - [`connection`]: request stream and control stream drivers
//! - [`handler`]: request handler traits and utilities
//!
//! # Limitations
//!
//! - No QPACK dynamic table: every dynamic reference is treated as absent,
//!   and the encoder only uses the static table
//! - The encoder never emits Huffman strings
//! - No server push

pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod qpack;
pub mod varint;

mod utils;
pub(crate) use utils::ensure;
