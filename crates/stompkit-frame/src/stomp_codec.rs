//! `tokio_util` codec adapter over the blocking wire codec.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, DecodeState, WireFormat};
use crate::error::FrameError;
use crate::frame::Frame;

/// Frames STOMP over any `AsyncRead`/`AsyncWrite` through `Framed`.
///
/// End-of-stream handling matches [`crate::FrameReader`]: a truncated frame
/// is classified exactly as the blocking reader does.
#[derive(Debug, Clone, Default)]
pub struct StompCodec {
    config: WireFormat,
    state: DecodeState,
}

impl StompCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WireFormat) -> Self {
        Self {
            config,
            state: DecodeState::default(),
        }
    }

    pub fn config(&self) -> &WireFormat {
        &self.config
    }
}

impl Decoder for StompCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.state.decode(src, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.state.decode_eof(src, &self.config)
    }
}

impl Encoder<Frame> for StompCodec {
    type Error = FrameError;

    fn encode(&mut self, mut item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&mut item, dst, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::command::Command;
    use crate::frame::FrameBuilder;
    use crate::header::HeaderType;

    fn send(body: &str) -> Frame {
        FrameBuilder::new(Command::Send)
            .header(HeaderType::Destination, "/queue/async")
            .payload(body)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn frames_cross_an_async_pipe() {
        let (client, server) = tokio::io::duplex(1024);
        let mut sink = FramedWrite::new(client, StompCodec::new());
        let mut stream = FramedRead::new(server, StompCodec::new());

        sink.send(send("first")).await.unwrap();
        sink.send(send("second")).await.unwrap();

        let one = stream.next().await.unwrap().unwrap();
        let two = stream.next().await.unwrap().unwrap();
        assert_eq!(one.payload(), Some("first"));
        assert_eq!(two.payload(), Some("second"));
        assert_eq!(one.header(HeaderType::Destination), Some("/queue/async"));
    }

    #[tokio::test]
    async fn truncated_frame_at_eof_is_reported() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut stream = FramedRead::new(server, StompCodec::new());

        client
            .write_all(b"MESSAGE\ncontent-length:10\n\nshort")
            .await
            .unwrap();
        drop(client);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[tokio::test]
    async fn clean_eof_ends_stream() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut stream = FramedRead::new(server, StompCodec::new());

        client.write_all(b"RECEIPT\nreceipt-id:7\n\n\0\n").await.unwrap();
        drop(client);

        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.command(), Command::Receipt);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn encoder_rejects_oversized_payload() {
        let mut codec = StompCodec::with_config(WireFormat {
            max_payload_len: 2,
            ..WireFormat::default()
        });
        let mut dst = BytesMut::new();
        let err = codec.encode(send("too long"), &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }
}
