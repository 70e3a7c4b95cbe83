//! Streaming HTTP/3 frame parser.
//!
//! Bytes arrive from a QUIC stream in arbitrary chunks: a chunk may hold no
//! frame, several frames, or end in the middle of one. Two entry points share
//! the same parsing rules:
//!
//! - [`FrameDecoder`] implements [`Decoder`] and is meant for `FramedRead`;
//!   incomplete frames stay in the read buffer until more bytes arrive.
//! - [`parse_frames`] is a stateless one-shot parse of a chunk that returns the
//!   frames together with the unconsumed remainder, which the caller prepends
//!   to the next chunk.
//!
//! Unknown frame types become [`Frame::Unknown`]. A frame whose payload cannot
//! be parsed (a SETTINGS payload cut inside a pair, an empty GOAWAY) is logged
//! and consumed; it never invalidates the frames already parsed.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use crate::codec::frame::{
    FRAME_CANCEL_PUSH, FRAME_DATA, FRAME_GOAWAY, FRAME_HEADERS, FRAME_MAX_PUSH_ID, FRAME_PUSH_PROMISE, FRAME_SETTINGS, Frame,
};
use crate::codec::settings::Settings;
use crate::ensure;
use crate::protocol::ParseError;
use crate::varint::decode_varint;

const MAX_RESERVE: usize = 64 * 1024;

/// Frames parsed from one chunk plus the bytes that did not form a complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrames {
    pub frames: Vec<Frame>,
    pub remainder: Bytes,
}

/// Parses every complete frame in `chunk`.
///
/// Parsing stops at the first incomplete frame; its type and length bytes are
/// part of `remainder`. Parsing also stops after a malformed frame, in which
/// case `remainder` starts right after it.
pub fn parse_frames(chunk: &[u8]) -> ParsedFrames {
    let mut src = BytesMut::from(chunk);
    let mut frames = Vec::new();

    loop {
        match decode_frame(&mut src, u64::MAX) {
            Ok(Decoded::Frame(frame)) => frames.push(frame),
            Ok(Decoded::Incomplete(_)) => break,
            Err(e) => {
                warn!(cause = %e, parsed = frames.len(), "stop parsing chunk at malformed frame");
                break;
            }
        }
    }

    ParsedFrames { frames, remainder: src.freeze() }
}

/// A [`Decoder`] producing one [`Frame`] per call.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_payload_size: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Rejects frames whose declared payload exceeds `max_payload_size` instead
    /// of buffering them.
    pub fn with_max_payload_size(max_payload_size: u64) -> Self {
        Self { max_payload_size }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self { max_payload_size: u64::MAX }
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = ParseError;

    /// Decodes the next frame from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(frame))`: a frame was decoded and removed from `src`
    /// - `Ok(None)`: need more data
    /// - `Err(_)`: the declared payload exceeds the configured maximum
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match decode_frame(src, self.max_payload_size) {
                Ok(Decoded::Frame(frame)) => return Ok(Some(frame)),
                Ok(Decoded::Incomplete(missing)) => {
                    // room for the rest of this frame, capped since the length is peer controlled
                    src.reserve(missing.min(MAX_RESERVE));
                    return Ok(None);
                }
                Err(MalformedFrame::TooLarge { frame_type, payload_len }) => {
                    return Err(ParseError::too_large_frame(frame_type, payload_len, self.max_payload_size));
                }
                Err(e) => warn!(cause = %e, "skipping malformed frame"),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            warn!(remaining = src.len(), "stream ended inside a frame, discarding partial frame");
            src.clear();
        }
        Ok(None)
    }
}

#[derive(Debug, thiserror::Error)]
enum MalformedFrame {
    #[error("invalid payload for frame type {frame_type:#x}")]
    InvalidPayload { frame_type: u64 },

    #[error("frame type {frame_type:#x} declares {payload_len} payload bytes")]
    TooLarge { frame_type: u64, payload_len: u64 },
}

#[derive(Debug)]
enum Decoded {
    Frame(Frame),
    /// Bytes still missing from the frame, 0 while its header is incomplete.
    Incomplete(usize),
}

/// Decodes one frame from the front of `src`.
///
/// On `Incomplete` nothing is consumed and `src` is left as is. On
/// `Err(InvalidPayload)` the malformed frame has been consumed.
fn decode_frame(src: &mut BytesMut, max_payload_size: u64) -> Result<Decoded, MalformedFrame> {
    let Some((frame_type, type_len)) = decode_varint(src) else {
        return Ok(Decoded::Incomplete(0));
    };
    let Some((payload_len, len_len)) = decode_varint(&src[type_len..]) else {
        return Ok(Decoded::Incomplete(0));
    };

    ensure!(payload_len <= max_payload_size, MalformedFrame::TooLarge { frame_type, payload_len });

    let header_len = type_len + len_len;
    let total_len = match usize::try_from(payload_len).ok().and_then(|len| len.checked_add(header_len)) {
        Some(total_len) => total_len,
        None => return Err(MalformedFrame::TooLarge { frame_type, payload_len }),
    };

    if src.len() < total_len {
        return Ok(Decoded::Incomplete(total_len - src.len()));
    }

    src.advance(header_len);
    let payload = src.split_to(total_len - header_len).freeze();
    trace!(frame_type, payload_len, "decoded frame");

    parse_payload(frame_type, payload).map(Decoded::Frame).ok_or(MalformedFrame::InvalidPayload { frame_type })
}

fn parse_payload(frame_type: u64, payload: Bytes) -> Option<Frame> {
    let frame = match frame_type {
        FRAME_DATA => Frame::Data(payload),
        FRAME_HEADERS => Frame::Headers(payload),
        FRAME_SETTINGS => Frame::Settings(Settings::decode(&payload)?),
        FRAME_GOAWAY => Frame::GoAway(decode_varint(&payload)?.0),
        FRAME_CANCEL_PUSH => Frame::CancelPush(decode_varint(&payload)?.0),
        FRAME_MAX_PUSH_ID => Frame::MaxPushId(decode_varint(&payload)?.0),
        FRAME_PUSH_PROMISE => {
            let (push_id, n) = decode_varint(&payload)?;
            Frame::PushPromise { push_id, encoded: payload.slice(n..) }
        }
        frame_type => Frame::Unknown { frame_type, payload },
    };
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::encode_varint;

    fn serialize(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            frame.encode(&mut buf);
        }
        buf.to_vec()
    }

    fn sample_frames() -> Vec<Frame> {
        vec![
            Frame::Settings([(0x01, 0), (0x06, 65_536), (0x07, 0)].into_iter().collect()),
            Frame::Headers(Bytes::from_static(&[0x00, 0x00, 0xd1, 0xc1])),
            Frame::Data(Bytes::from(vec![0xab; 200])),
            Frame::Unknown { frame_type: 0x21, payload: Bytes::new() },
            // two byte type varint
            Frame::Unknown { frame_type: 0x99, payload: Bytes::from_static(&[1, 2, 3]) },
            Frame::Data(Bytes::new()),
            Frame::GoAway(u64::from(u32::MAX) + 7),
            Frame::MaxPushId(12),
            Frame::CancelPush(3),
            Frame::PushPromise { push_id: 9, encoded: Bytes::from_static(&[0x00, 0x00, 0xc1]) },
        ]
    }

    #[test]
    fn data_frame_round_trip() {
        for payload in [Vec::new(), b"x".to_vec(), vec![0u8; 63], vec![1u8; 64], vec![2u8; 20_000]] {
            let frame = Frame::Data(Bytes::from(payload));
            let parsed = parse_frames(&frame.to_bytes());
            assert_eq!(parsed.frames, vec![frame]);
            assert!(parsed.remainder.is_empty());
        }
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let frames = sample_frames();
        let parsed = parse_frames(&serialize(&frames));
        assert_eq!(parsed.frames, frames);
        assert!(parsed.remainder.is_empty());
    }

    #[test]
    fn chunking_invariance() {
        let frames = sample_frames();
        let wire = serialize(&frames);

        for split in 0..=wire.len() {
            let first = parse_frames(&wire[..split]);
            let mut next = first.remainder.to_vec();
            next.extend_from_slice(&wire[split..]);
            let second = parse_frames(&next);

            let mut all = first.frames;
            all.extend(second.frames);
            assert_eq!(all, frames, "split at {split}");
            assert!(second.remainder.is_empty(), "split at {split}");
        }
    }

    #[test]
    fn incomplete_header_is_remainder() {
        let parsed = parse_frames(&[0x00]);
        assert!(parsed.frames.is_empty());
        assert_eq!(&parsed.remainder[..], &[0x00]);

        // two-byte length with only its first byte
        let parsed = parse_frames(&[0x00, 0x40]);
        assert_eq!(&parsed.remainder[..], &[0x00, 0x40]);
    }

    #[test]
    fn incomplete_payload_keeps_type_and_length() {
        let mut wire = Frame::Headers(Bytes::from_static(b"abc")).to_bytes().to_vec();
        wire.extend_from_slice(&[0x00, 0x05, b'h', b'e']);

        let parsed = parse_frames(&wire);
        assert_eq!(parsed.frames, vec![Frame::Headers(Bytes::from_static(b"abc"))]);
        assert_eq!(&parsed.remainder[..], &[0x00, 0x05, b'h', b'e']);
    }

    #[test]
    fn unknown_frame_passthrough() {
        let mut wire = Vec::new();
        encode_varint(0x99, &mut wire);
        encode_varint(3, &mut wire);
        wire.extend_from_slice(&[1, 2, 3]);

        let parsed = parse_frames(&wire);
        assert_eq!(parsed.frames, vec![Frame::Unknown { frame_type: 0x99, payload: Bytes::from_static(&[1, 2, 3]) }]);
        assert!(parsed.remainder.is_empty());
    }

    #[test]
    fn reserved_http2_types_are_preserved() {
        let wire = [0x02, 0x01, 0xff];
        let parsed = parse_frames(&wire);
        assert_eq!(parsed.frames, vec![Frame::Unknown { frame_type: 0x02, payload: Bytes::from_static(&[0xff]) }]);
    }

    #[test]
    fn malformed_frame_stops_parse_after_prior_frames() {
        let mut wire = Frame::Data(Bytes::from_static(b"ok")).to_bytes().to_vec();
        // SETTINGS whose payload ends inside a pair
        wire.extend_from_slice(&[0x04, 0x01, 0x06]);
        let tail = Frame::Data(Bytes::from_static(b"tail")).to_bytes();
        wire.extend_from_slice(&tail);

        let parsed = parse_frames(&wire);
        assert_eq!(parsed.frames, vec![Frame::Data(Bytes::from_static(b"ok"))]);
        assert_eq!(parsed.remainder, tail);

        let next = parse_frames(&parsed.remainder);
        assert_eq!(next.frames, vec![Frame::Data(Bytes::from_static(b"tail"))]);
    }

    #[test]
    fn decoder_skips_malformed_frames() {
        let mut src = BytesMut::from(&[0x07, 0x00][..]);
        Frame::GoAway(4).encode(&mut src);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(&mut src).unwrap(), Some(Frame::GoAway(4)));
        assert!(src.is_empty());
    }

    #[test]
    fn decoder_streams_across_chunks() {
        let wire = serialize(&sample_frames());
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::new();
        let mut frames = Vec::new();

        for chunk in wire.chunks(7) {
            src.extend_from_slice(chunk);
            while let Some(frame) = decoder.decode(&mut src).unwrap() {
                frames.push(frame);
            }
        }
        assert_eq!(frames, sample_frames());
        assert!(src.is_empty());
    }

    #[test]
    fn decoder_rejects_oversized_payload() {
        let mut src = BytesMut::new();
        encode_varint(FRAME_DATA, &mut src);
        encode_varint(1 << 20, &mut src);

        let mut decoder = FrameDecoder::with_max_payload_size(1024);
        assert!(matches!(decoder.decode(&mut src), Err(ParseError::TooLargeFrame { .. })));
    }

    #[test]
    fn incomplete_frame_leaves_buffer_untouched() {
        let mut src = BytesMut::from(&[0x00, 0x05, b'h'][..]);
        let capacity = src.capacity();
        assert!(matches!(decode_frame(&mut src, u64::MAX), Ok(Decoded::Incomplete(4))));
        assert_eq!(src.capacity(), capacity);
        assert_eq!(&src[..], &[0x00, 0x05, b'h']);
    }

    #[test]
    fn decoder_reserves_for_pending_payload() {
        let mut src = BytesMut::from(&[0x00, 0x40, 0x64, b'h'][..]);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(&mut src).unwrap(), None);
        assert!(src.capacity() >= 103);
    }

    #[test]
    fn decode_eof_discards_partial_frame() {
        let mut src = BytesMut::from(&[0x00, 0x05, b'h'][..]);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode_eof(&mut src).unwrap(), None);
        assert!(src.is_empty());
    }
}
