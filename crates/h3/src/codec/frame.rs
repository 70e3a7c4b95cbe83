//! HTTP/3 frame types (RFC 9114 §7.2).
//!
//! Every frame is `varint(type) || varint(length) || payload`. QUIC takes care
//! of multiplexing and flow control, so there are no stream ids or flags in
//! the frame header.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::settings::Settings;
use crate::protocol::VarintError;
use crate::varint::{MAX_VARINT, encode_varint, varint_len};

pub const FRAME_DATA: u64 = 0x00;
pub const FRAME_HEADERS: u64 = 0x01;
pub const FRAME_CANCEL_PUSH: u64 = 0x03;
pub const FRAME_SETTINGS: u64 = 0x04;
pub const FRAME_PUSH_PROMISE: u64 = 0x05;
pub const FRAME_GOAWAY: u64 = 0x07;
pub const FRAME_MAX_PUSH_ID: u64 = 0x0d;

/// An HTTP/3 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Request or response body bytes.
    Data(Bytes),
    /// A QPACK-encoded field section, kept opaque.
    Headers(Bytes),
    CancelPush(u64),
    Settings(Settings),
    PushPromise { push_id: u64, encoded: Bytes },
    /// Last stream id the sender will process.
    GoAway(u64),
    MaxPushId(u64),
    /// Any other frame type, payload preserved as-is (RFC 9114 §9).
    Unknown { frame_type: u64, payload: Bytes },
}

impl Frame {
    /// Wire type code of this frame.
    pub fn frame_type(&self) -> u64 {
        match self {
            Frame::Data(_) => FRAME_DATA,
            Frame::Headers(_) => FRAME_HEADERS,
            Frame::CancelPush(_) => FRAME_CANCEL_PUSH,
            Frame::Settings(_) => FRAME_SETTINGS,
            Frame::PushPromise { .. } => FRAME_PUSH_PROMISE,
            Frame::GoAway(_) => FRAME_GOAWAY,
            Frame::MaxPushId(_) => FRAME_MAX_PUSH_ID,
            Frame::Unknown { frame_type, .. } => *frame_type,
        }
    }

    /// Length of the payload as written in the frame header.
    pub fn payload_len(&self) -> usize {
        match self {
            Frame::Data(payload) | Frame::Headers(payload) | Frame::Unknown { payload, .. } => payload.len(),
            Frame::CancelPush(id) | Frame::GoAway(id) | Frame::MaxPushId(id) => varint_len(*id),
            Frame::Settings(settings) => settings.encoded_len(),
            Frame::PushPromise { push_id, encoded } => varint_len(*push_id) + encoded.len(),
        }
    }

    /// Total encoded length, header included.
    pub fn encoded_len(&self) -> usize {
        let payload_len = self.payload_len();
        varint_len(self.frame_type()) + varint_len(payload_len as u64) + payload_len
    }

    /// Appends the serialized frame to `dst`.
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        encode_varint(self.frame_type(), dst);
        encode_varint(self.payload_len() as u64, dst);

        match self {
            Frame::Data(payload) | Frame::Headers(payload) | Frame::Unknown { payload, .. } => dst.put_slice(payload),
            Frame::CancelPush(id) | Frame::GoAway(id) | Frame::MaxPushId(id) => encode_varint(*id, dst),
            Frame::Settings(settings) => settings.encode(dst),
            Frame::PushPromise { push_id, encoded } => {
                encode_varint(*push_id, dst);
                dst.put_slice(encoded);
            }
        }
    }

    /// Checks that every integer carried by the frame fits in a varint.
    ///
    /// [`encode`](Self::encode) panics on frames that fail this check.
    pub fn check_varints(&self) -> Result<(), VarintError> {
        let check = |value: u64| if value <= MAX_VARINT { Ok(()) } else { Err(VarintError::Overflow(value)) };

        check(self.frame_type())?;
        match self {
            Frame::CancelPush(id) | Frame::GoAway(id) | Frame::MaxPushId(id) | Frame::PushPromise { push_id: id, .. } => check(*id),
            Frame::Settings(settings) => settings.iter().try_for_each(|(id, value)| {
                check(id)?;
                check(value)
            }),
            Frame::Data(_) | Frame::Headers(_) | Frame::Unknown { .. } => Ok(()),
        }
    }

    /// Serializes the frame into its own buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut dst);
        dst.freeze()
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Frame::Data(_))
    }

    pub fn is_headers(&self) -> bool {
        matches!(self, Frame::Headers(_))
    }
}
