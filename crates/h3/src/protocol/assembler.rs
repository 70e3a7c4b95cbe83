//! Conversion between a stream's frames and `http` messages.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri, Version};
use tracing::trace;

use crate::codec::Frame;
use crate::config::H3Config;
use crate::ensure;
use crate::protocol::ParseError;
use crate::qpack::{HeaderField, QpackDecoder, QpackEncoder};

/// Builds requests and responses out of HTTP/3 frames, and frames out of them.
///
/// An assembler owns the QPACK encoder and decoder of one stream session and
/// must not be shared between concurrently processed streams.
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    encoder: QpackEncoder,
    decoder: QpackDecoder,
    max_field_section_size: Option<u64>,
}

impl MessageAssembler {
    pub fn new(config: &H3Config) -> Self {
        Self {
            encoder: QpackEncoder::new(config.qpack_max_table_capacity()),
            decoder: QpackDecoder::new(config.qpack_max_table_capacity(), config.decode_policy()),
            max_field_section_size: config.max_field_section_size(),
        }
    }

    /// Assembles a request from the first HEADERS frame and every DATA frame.
    ///
    /// Missing `:method` and `:path` default to `GET` and `/`. Other pseudo
    /// headers are dropped. Returns `Ok(None)` when no HEADERS frame is present.
    pub fn extract_request(&mut self, frames: &[Frame]) -> Result<Option<Request<Bytes>>, ParseError> {
        let Some(fields) = self.decode_first_headers(frames)? else {
            return Ok(None);
        };

        let mut method = None;
        let mut path = None;
        let mut headers = HeaderMap::with_capacity(fields.len());
        for field in fields {
            let (name, value) = field.into_parts();
            match &name[..] {
                b":method" => {
                    method.get_or_insert(value);
                }
                b":path" => {
                    path.get_or_insert(value);
                }
                _ if name.first() == Some(&b':') => trace!(name = ?name, "discard pseudo header"),
                _ => append_header(&mut headers, &name, value)?,
            }
        }

        let method = match method {
            Some(method) => Method::from_bytes(&method).map_err(|_| ParseError::InvalidMethod)?,
            None => Method::GET,
        };
        let uri = match path {
            Some(path) => Uri::from_maybe_shared(path).map_err(|_| ParseError::InvalidUri)?,
            None => Uri::from_static("/"),
        };

        let mut request = Request::new(collect_body(frames));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = Version::HTTP_3;
        *request.headers_mut() = headers;

        trace!(method = %request.method(), uri = %request.uri(), body_len = request.body().len(), "extracted request");
        Ok(Some(request))
    }

    /// Encodes a response as serialized frames in write order: one HEADERS
    /// frame, then a DATA frame when `body` is not empty.
    ///
    /// Every value of a multi-valued header becomes its own field line.
    pub fn create_response(&mut self, status: StatusCode, headers: &HeaderMap, body: Bytes) -> Vec<Bytes> {
        let mut fields = Vec::with_capacity(headers.len() + 1);
        fields.push(HeaderField::new(":status", Bytes::copy_from_slice(status.as_str().as_bytes())));
        push_header_fields(&mut fields, headers);

        self.encode_message(&fields, body)
    }

    pub fn encode_response(&mut self, response: Response<Bytes>) -> Vec<Bytes> {
        let (parts, body) = response.into_parts();
        self.create_response(parts.status, &parts.headers, body)
    }

    /// Encodes a request as serialized frames in write order.
    ///
    /// `:scheme` defaults to `https` and `:path` to `/` when the uri has none.
    pub fn create_request(&mut self, request: &Request<Bytes>) -> Vec<Bytes> {
        let uri = request.uri();
        let mut fields = Vec::with_capacity(request.headers().len() + 4);

        fields.push(HeaderField::new(":method", Bytes::copy_from_slice(request.method().as_str().as_bytes())));
        fields.push(HeaderField::new(":scheme", Bytes::copy_from_slice(uri.scheme_str().unwrap_or("https").as_bytes())));
        if let Some(authority) = uri.authority() {
            fields.push(HeaderField::new(":authority", Bytes::copy_from_slice(authority.as_str().as_bytes())));
        }
        let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        fields.push(HeaderField::new(":path", Bytes::copy_from_slice(path.as_bytes())));
        push_header_fields(&mut fields, request.headers());

        self.encode_message(&fields, request.body().clone())
    }

    /// Assembles a response from the first HEADERS frame and every DATA frame.
    pub fn extract_response(&mut self, frames: &[Frame]) -> Result<Option<Response<Bytes>>, ParseError> {
        let Some(fields) = self.decode_first_headers(frames)? else {
            return Ok(None);
        };

        let mut status = None;
        let mut headers = HeaderMap::with_capacity(fields.len());
        for field in fields {
            let (name, value) = field.into_parts();
            match &name[..] {
                b":status" => {
                    status.get_or_insert(value);
                }
                _ if name.first() == Some(&b':') => trace!(name = ?name, "discard pseudo header"),
                _ => append_header(&mut headers, &name, value)?,
            }
        }

        let status = status.ok_or(ParseError::InvalidStatus)?;
        let status = StatusCode::from_bytes(&status).map_err(|_| ParseError::InvalidStatus)?;

        let mut response = Response::new(collect_body(frames));
        *response.status_mut() = status;
        *response.version_mut() = Version::HTTP_3;
        *response.headers_mut() = headers;
        Ok(Some(response))
    }

    fn decode_first_headers(&mut self, frames: &[Frame]) -> Result<Option<Vec<HeaderField>>, ParseError> {
        let block = frames.iter().find_map(|frame| match frame {
            Frame::Headers(block) => Some(block),
            _ => None,
        });
        let Some(block) = block else {
            return Ok(None);
        };

        let fields = self.decoder.decode(block)?;
        if let Some(max_size) = self.max_field_section_size {
            let section_size = fields.iter().map(HeaderField::size).sum::<u64>();
            ensure!(section_size <= max_size, ParseError::too_large_header(section_size, max_size));
        }
        Ok(Some(fields))
    }

    fn encode_message(&mut self, fields: &[HeaderField], body: Bytes) -> Vec<Bytes> {
        let block = self.encoder.encode_to_bytes(fields);
        let mut frames = vec![Frame::Headers(block).to_bytes()];
        if !body.is_empty() {
            frames.push(Frame::Data(body).to_bytes());
        }
        frames
    }
}

fn append_header(headers: &mut HeaderMap, name: &[u8], value: Bytes) -> Result<(), ParseError> {
    let name = HeaderName::from_bytes(name).map_err(ParseError::invalid_header)?;
    let value = HeaderValue::from_maybe_shared(value).map_err(ParseError::invalid_header)?;
    headers.append(name, value);
    Ok(())
}

fn push_header_fields(fields: &mut Vec<HeaderField>, headers: &HeaderMap) {
    for (name, value) in headers {
        fields.push(HeaderField::new(
            Bytes::copy_from_slice(name.as_str().as_bytes()),
            Bytes::copy_from_slice(value.as_bytes()),
        ));
    }
}

/// Concatenates DATA payloads in frame order, without copying when there is only one.
fn collect_body(frames: &[Frame]) -> Bytes {
    let mut data = frames.iter().filter_map(|frame| match frame {
        Frame::Data(payload) => Some(payload),
        _ => None,
    });

    let Some(first) = data.next() else {
        return Bytes::new();
    };
    let rest: Vec<&Bytes> = data.collect();
    if rest.is_empty() {
        return first.clone();
    }

    let mut body = BytesMut::with_capacity(first.len() + rest.iter().map(|b| b.len()).sum::<usize>());
    body.extend_from_slice(first);
    for payload in rest {
        body.extend_from_slice(payload);
    }
    body.freeze()
}
