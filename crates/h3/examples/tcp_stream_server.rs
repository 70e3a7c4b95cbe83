//! Serves HTTP/3 request streams carried over plain TCP.
//!
//! Each accepted TCP connection stands in for one bidirectional QUIC request
//! stream: the client writes HEADERS and DATA frames, closes its write side,
//! and reads the response frames back.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use micro_h3::config::H3Config;
use micro_h3::connection::H3StreamConnection;
use micro_h3::handler::Handler;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match H3Config::builder().max_field_section_size(16 * 1024).build() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(cause = %e, "invalid config");
            return;
        }
    };

    info!(port = 8443, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8443").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let handler = Arc::new(SimpleHandler);
    loop {
        let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = handler.clone();
        let config = config.clone();

        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = H3StreamConnection::new(reader, writer, &config);
            if let Err(e) = connection.process(handler).await {
                error!("stream process error, cause {}", e);
            }
        });
    }
}

struct SimpleHandler;

#[async_trait]
impl Handler for SimpleHandler {
    type RespBody = String;
    type Error = Infallible;

    async fn call(&self, request: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        info!(path = request.uri().path(), body_len = request.body().len(), "handle request");

        let mut response = Response::new("Hello World!".to_string());
        *response.status_mut() = StatusCode::OK;
        Ok(response)
    }
}
