use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::frame::Frame;
use crate::protocol::SendError;

/// Writes [`Frame`]s to a `FramedWrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder;

impl FrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Frame> for FrameEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&Frame>::encode(self, &item, dst)
    }
}

impl Encoder<&Frame> for FrameEncoder {
    type Error = SendError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.check_varints()?;
        trace!(frame_type = item.frame_type(), payload_len = item.payload_len(), "encode frame");
        dst.reserve(item.encoded_len());
        item.encode(dst);
        Ok(())
    }
}
