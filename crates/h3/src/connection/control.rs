//! The HTTP/3 control stream (RFC 9114 §6.2.1).
//!
//! Each side opens exactly one unidirectional control stream. It starts with
//! the stream type, followed by a SETTINGS frame and then connection level
//! frames such as GOAWAY.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{info, warn};

use crate::codec::{FRAME_SETTINGS, Frame, FrameDecoder, FrameEncoder, Settings};
use crate::config::H3Config;
use crate::protocol::{ParseError, SendError};
use crate::varint::decode_varint;

/// Unidirectional stream type of a control stream.
pub const STREAM_TYPE_CONTROL: u64 = 0x00;

/// The local end of a control stream.
#[derive(Debug)]
pub struct ControlStream<W> {
    framed_write: FramedWrite<W, FrameEncoder>,
}

impl<W> ControlStream<W>
where
    W: AsyncWrite + Unpin,
{
    /// Writes the stream type and the SETTINGS derived from `config`.
    pub async fn open(writer: W, config: &H3Config) -> Result<Self, SendError> {
        let mut framed_write = FramedWrite::new(writer, FrameEncoder::new());
        framed_write.get_mut().write_all(&[STREAM_TYPE_CONTROL as u8]).await.map_err(SendError::io)?;

        let settings = config.settings();
        info!(settings = settings.len(), "open control stream");
        framed_write.send(Frame::Settings(settings)).await?;

        Ok(Self { framed_write })
    }

    /// Announces that no request stream above `stream_id` will be processed.
    pub async fn goaway(&mut self, stream_id: u64) -> Result<(), SendError> {
        info!(stream_id, "send goaway");
        self.framed_write.send(Frame::GoAway(stream_id)).await
    }

    pub async fn send(&mut self, frame: Frame) -> Result<(), SendError> {
        self.framed_write.send(frame).await
    }

    pub fn into_inner(self) -> W {
        self.framed_write.into_inner()
    }
}

/// The peer's end of a control stream, after its SETTINGS have been read.
#[derive(Debug)]
pub struct PeerControlStream<R> {
    framed_read: FramedRead<R, FrameDecoder>,
    settings: Settings,
}

impl<R> PeerControlStream<R>
where
    R: AsyncRead + Unpin,
{
    /// Reads the stream type and the mandatory leading SETTINGS frame.
    pub async fn accept(mut reader: R) -> Result<Self, ParseError> {
        let stream_type = read_stream_type(&mut reader).await?;
        if stream_type != STREAM_TYPE_CONTROL {
            return Err(ParseError::UnexpectedStreamType(stream_type));
        }

        let mut framed_read = FramedRead::new(reader, FrameDecoder::new());
        let settings = match framed_read.next().await {
            Some(Ok(Frame::Settings(settings))) => settings,
            Some(Ok(frame)) => return Err(ParseError::missing_settings(frame.frame_type())),
            Some(Err(e)) => return Err(e),
            None => return Err(ParseError::io(std::io::ErrorKind::UnexpectedEof)),
        };
        info!(settings = ?settings, "received peer settings");

        Ok(Self { framed_read, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Next frame after SETTINGS. A repeated SETTINGS frame is skipped.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, ParseError>> {
        loop {
            match self.framed_read.next().await? {
                Ok(frame) if frame.frame_type() == FRAME_SETTINGS => warn!("skipping repeated SETTINGS frame"),
                result => return Some(result),
            }
        }
    }
}

/// Reads the type and SETTINGS of a peer control stream, discarding the rest.
pub async fn read_peer_settings<R>(reader: R) -> Result<Settings, ParseError>
where
    R: AsyncRead + Unpin,
{
    PeerControlStream::accept(reader).await.map(|stream| stream.settings)
}

async fn read_stream_type<R>(reader: &mut R) -> Result<u64, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8];
    buf[0] = reader.read_u8().await?;
    let len = 1 << (buf[0] >> 6);
    reader.read_exact(&mut buf[1..len]).await?;

    decode_varint(&buf[..len]).map(|(value, _)| value).ok_or_else(|| ParseError::io(std::io::ErrorKind::InvalidData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{SETTINGS_MAX_FIELD_SECTION_SIZE, parse_frames};

    #[tokio::test]
    async fn open_writes_type_and_settings() {
        let config = H3Config::builder().max_field_section_size(4096).build().unwrap();
        let mut control = ControlStream::open(Vec::new(), &config).await.unwrap();
        control.goaway(8).await.unwrap();
        assert!(format!("{control:?}").starts_with("ControlStream"));

        let wire = control.into_inner();
        assert_eq!(wire[0], 0x00);
        let parsed = parse_frames(&wire[1..]);
        assert_eq!(parsed.frames, vec![Frame::Settings([(SETTINGS_MAX_FIELD_SECTION_SIZE, 4096)].into_iter().collect()), Frame::GoAway(8)]);
    }

    #[tokio::test]
    async fn goaway_rejects_out_of_range_id() {
        let mut control = ControlStream::open(Vec::new(), &H3Config::default()).await.unwrap();
        assert!(matches!(control.goaway(u64::MAX).await, Err(SendError::Varint { .. })));
    }

    #[tokio::test]
    async fn accept_reads_settings_then_frames() {
        let mut wire = vec![0x00];
        wire.extend_from_slice(&Frame::Settings([(0x01, 100)].into_iter().collect()).to_bytes());
        wire.extend_from_slice(&Frame::Settings(Settings::new()).to_bytes());
        wire.extend_from_slice(&Frame::GoAway(4).to_bytes());

        let mut stream = PeerControlStream::accept(&wire[..]).await.unwrap();
        assert_eq!(stream.settings().qpack_max_table_capacity(), 100);
        assert!(format!("{stream:?}").starts_with("PeerControlStream"));
        assert_eq!(stream.next_frame().await.unwrap().unwrap(), Frame::GoAway(4));
        assert!(stream.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn first_frame_must_be_settings() {
        let mut wire = vec![0x00];
        wire.extend_from_slice(&Frame::GoAway(0).to_bytes());

        let result = read_peer_settings(&wire[..]).await;
        assert!(matches!(result, Err(ParseError::MissingSettings { frame_type: 0x07 })));
    }

    #[tokio::test]
    async fn rejects_other_stream_types() {
        // two byte varint encoding of the QPACK encoder stream type
        let wire = [0x40, 0x02, 0x04, 0x00];
        let result = read_peer_settings(&wire[..]).await;
        assert!(matches!(result, Err(ParseError::UnexpectedStreamType(0x02))));
    }

    #[tokio::test]
    async fn empty_stream() {
        let result = read_peer_settings(&[0u8; 0][..]).await;
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }
}
