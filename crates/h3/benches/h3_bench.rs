use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use http::{HeaderMap, Request, Response, StatusCode};
use micro_h3::codec::{Frame, FrameDecoder, parse_frames};
use micro_h3::config::H3Config;
use micro_h3::connection::H3StreamConnection;
use micro_h3::handler::make_handler;
use micro_h3::protocol::MessageAssembler;
use micro_h3::qpack::{HeaderField, QpackDecoder, QpackEncoder};
use std::{
    convert::Infallible,
    hint::black_box,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::Decoder;

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Bytes,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Bytes) -> Self {
        Self { read_data, read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

async fn test_handler(_req: Request<Bytes>) -> Result<Response<String>, Infallible> {
    Ok(Response::new("Hello World!".to_string()))
}

fn request_fields() -> Vec<HeaderField> {
    vec![
        HeaderField::new(":method", "POST"),
        HeaderField::new(":scheme", "https"),
        HeaderField::new(":authority", "localhost"),
        HeaderField::new(":path", "/api/users"),
        HeaderField::new("content-type", "application/json"),
        HeaderField::new("user-agent", "micro-h3-bench/0.3"),
        HeaderField::new("x-request-id", "7f1c9a52-0d1e-4c07-9b7d-3a0f5c1e8d44"),
    ]
}

fn request_wire() -> Bytes {
    let mut wire = BytesMut::new();
    Frame::Headers(QpackEncoder::default().encode_to_bytes(&request_fields())).encode(&mut wire);
    Frame::Data(Bytes::from_static(br#"{"name":"John"}"#)).encode(&mut wire);
    wire.freeze()
}

fn bench_qpack(c: &mut Criterion) {
    let fields = request_fields();
    let block = QpackEncoder::default().encode_to_bytes(&fields);

    c.bench_function("qpack_encode_request", |b| {
        let mut encoder = QpackEncoder::default();
        b.iter(|| black_box(encoder.encode_to_bytes(black_box(&fields))));
    });

    c.bench_function("qpack_decode_request", |b| {
        let mut decoder = QpackDecoder::default();
        b.iter(|| black_box(decoder.decode(black_box(&block)).unwrap()));
    });
}

fn bench_frames(c: &mut Criterion) {
    let wire = request_wire();

    c.bench_function("parse_frames", |b| {
        b.iter(|| black_box(parse_frames(black_box(&wire))));
    });

    c.bench_function("frame_decoder", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut bytes = BytesMut::from(&wire[..]);
            while let Some(frame) = decoder.decode(&mut bytes).unwrap() {
                black_box(frame);
            }
        });
    });
}

fn bench_assembler(c: &mut Criterion) {
    let frames = parse_frames(&request_wire()).frames;
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, "application/json".parse().unwrap());

    c.bench_function("extract_request", |b| {
        let mut assembler = MessageAssembler::new(&H3Config::default());
        b.iter(|| black_box(assembler.extract_request(black_box(&frames)).unwrap()));
    });

    c.bench_function("create_response", |b| {
        let mut assembler = MessageAssembler::new(&H3Config::default());
        b.iter(|| black_box(assembler.create_response(StatusCode::OK, &headers, Bytes::from_static(b"{\"id\":1}"))));
    });
}

fn bench_stream_connection(c: &mut Criterion) {
    let wire = request_wire();
    let handler = Arc::new(make_handler(test_handler));
    let config = H3Config::default();

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(wire.clone());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let connection = H3StreamConnection::new(reader, writer, &config);
            black_box(block_on(connection.process(handler.clone())).unwrap());
        });
    });
}

criterion_group!(benches, bench_qpack, bench_frames, bench_assembler, bench_stream_connection);
criterion_main!(benches);
