use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use http::{HeaderMap, Response, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{error, info, trace, warn};

use crate::codec::{Frame, FrameDecoder};
use crate::config::H3Config;
use crate::ensure;
use crate::handler::Handler;
use crate::protocol::{HttpError, MessageAssembler, ParseError, SendError};

/// Serves one request on one bidirectional HTTP/3 request stream.
///
/// The reader and writer are the two halves of a QUIC stream handed over by
/// the transport. The request is read until the peer finishes its side of the
/// stream, then the handler's response is written and the write side is shut
/// down.
///
/// # Type Parameters
///
/// * `R`: The async readable half of the stream
/// * `W`: The async writable half of the stream
#[derive(Debug)]
pub struct H3StreamConnection<R, W> {
    framed_read: FramedRead<R, FrameDecoder>,
    writer: W,
    assembler: MessageAssembler,
    max_request_body_size: u64,
}

impl<R, W> H3StreamConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, config: &H3Config) -> Self {
        let decoder = FrameDecoder::with_max_payload_size(config.max_frame_payload_size());
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, config.read_buffer_size()),
            writer,
            assembler: MessageAssembler::new(config),
            max_request_body_size: config.max_request_body_size(),
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        let frames = match self.read_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                error!(cause = %e, "can't read request frames");
                return Err(self.reject(e).await);
            }
        };

        let request = match self.assembler.extract_request(&frames) {
            Ok(Some(request)) => request,
            Ok(None) => {
                error!(frames = frames.len(), "request stream ended without HEADERS");
                return Err(self.reject(ParseError::MissingHeaders).await);
            }
            Err(e) => {
                error!(cause = %e, "can't assemble request");
                return Err(self.reject(e).await);
            }
        };

        info!(method = %request.method(), uri = %request.uri(), "received request");
        let response_result = handler.call(request).await;
        self.send_response(response_result).await
    }

    /// Reads the stream to its end, keeping the first HEADERS frame and the
    /// DATA frames. Everything else is dropped as it arrives.
    async fn read_frames(&mut self) -> Result<Vec<Frame>, ParseError> {
        let mut frames = Vec::new();
        let mut has_headers = false;
        let mut body_size = 0u64;

        while let Some(frame) = self.framed_read.next().await {
            let frame = frame?;
            trace!(frame_type = frame.frame_type(), "received frame");
            match &frame {
                Frame::Headers(_) if !has_headers => has_headers = true,
                Frame::Data(payload) => {
                    body_size = body_size.saturating_add(payload.len() as u64);
                    ensure!(
                        body_size <= self.max_request_body_size,
                        ParseError::too_large_body(body_size, self.max_request_body_size)
                    );
                }
                _ => continue,
            }
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Answers 400 and hands back `e`. A failure to write the answer is only logged.
    async fn reject(&mut self, e: ParseError) -> HttpError {
        if let Err(send_error) = self.send_error_response(StatusCode::BAD_REQUEST).await {
            warn!(cause = %send_error, "can't send bad request response");
        }
        e.into()
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>) -> Result<(), HttpError>
    where
        T: Body,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                self.send_error_response(StatusCode::INTERNAL_SERVER_ERROR).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body,
        T::Error: Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| SendError::invalid_body(format!("resolve response body error: {e}")))?
            .to_bytes();

        let frames = self.assembler.create_response(parts.status, &parts.headers, body);
        self.write_frames(&frames).await?;
        info!(status = %parts.status, "sent response");
        Ok(())
    }

    async fn send_error_response(&mut self, status: StatusCode) -> Result<(), HttpError> {
        let frames = self.assembler.create_response(status, &HeaderMap::new(), Bytes::new());
        self.write_frames(&frames).await
    }

    async fn write_frames(&mut self, frames: &[Bytes]) -> Result<(), HttpError> {
        for frame in frames {
            self.writer.write_all(frame).await.map_err(SendError::io)?;
        }
        self.writer.flush().await.map_err(SendError::io)?;
        self.writer.shutdown().await.map_err(SendError::io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use std::convert::Infallible;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }
    }

    async fn ok(_req: http::Request<Bytes>) -> Result<Response<String>, Infallible> {
        Ok(Response::new(String::new()))
    }

    #[tokio::test]
    async fn parse_error_survives_failed_error_response() {
        let wire = Frame::Data(Bytes::from_static(b"orphan")).to_bytes();
        let connection = H3StreamConnection::new(&wire[..], BrokenWriter, &H3Config::default());

        let result = connection.process(Arc::new(make_handler(ok))).await;
        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::MissingHeaders })));
    }

    #[test]
    fn debug_output_names_type() {
        let connection = H3StreamConnection::new(&b""[..], Vec::<u8>::new(), &H3Config::default());
        assert!(format!("{connection:?}").starts_with("H3StreamConnection"));
    }

    #[tokio::test]
    async fn keeps_only_first_headers_and_data() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&Frame::Unknown { frame_type: 0x21, payload: Bytes::from_static(b"grease") }.to_bytes());
        wire.extend_from_slice(&Frame::Headers(Bytes::from_static(&[0x00, 0x00, 0xd1])).to_bytes());
        wire.extend_from_slice(&Frame::Data(Bytes::from_static(b"a")).to_bytes());
        wire.extend_from_slice(&Frame::Headers(Bytes::from_static(&[0x00, 0x00, 0xd4])).to_bytes());
        wire.extend_from_slice(&Frame::GoAway(0).to_bytes());
        wire.extend_from_slice(&Frame::Data(Bytes::from_static(b"b")).to_bytes());

        let mut connection = H3StreamConnection::new(&wire[..], Vec::new(), &H3Config::default());
        let frames = connection.read_frames().await.unwrap();
        assert_eq!(
            frames,
            vec![
                Frame::Headers(Bytes::from_static(&[0x00, 0x00, 0xd1])),
                Frame::Data(Bytes::from_static(b"a")),
                Frame::Data(Bytes::from_static(b"b")),
            ]
        );
    }

    #[tokio::test]
    async fn body_limit_spans_data_frames() {
        let config = H3Config::builder().max_frame_payload_size(8).max_request_body_size(16).build().unwrap();
        let mut wire = Frame::Headers(Bytes::from_static(&[0x00, 0x00, 0xd1])).to_bytes().to_vec();
        for _ in 0..3 {
            wire.extend_from_slice(&Frame::Data(Bytes::from_static(b"12345678")).to_bytes());
        }

        let mut connection = H3StreamConnection::new(&wire[..], Vec::new(), &config);
        let result = connection.read_frames().await;
        assert!(matches!(result, Err(ParseError::TooLargeBody { current_size: 24, max_size: 16 })));
    }
}
