//! Opcode-tagged, length-prefixed frame encoding/decoding
//!
//! Wire format: [1-byte opcode][4-byte big-endian payload length][payload]
//! Maximum payload size: 64KB (sanity limit)

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use cefpipe_core::{Message, ProtocolError, MAX_PAYLOAD_LEN};

use crate::error::{Error, Result};

/// Opcode byte plus length prefix
pub const HEADER_LEN: usize = 5;

/// Encode a message into a complete frame
pub fn encode_frame(msg: &Message) -> Vec<u8> {
    let payload = msg.to_payload();
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(msg.opcode());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    frame
}

/// Read exactly one frame from a stream
///
/// Never reads past the declared frame boundary. A frame with an unknown
/// opcode or a wrong payload length is consumed in full before the error is
/// returned, so the next call starts on the following frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut header = [0u8; HEADER_LEN];
    read_exact(reader, &mut header).await?;

    let [opcode, l0, l1, l2, l3] = header;
    let len = u32::from_be_bytes([l0, l1, l2, l3]);

    if len > MAX_PAYLOAD_LEN {
        return Err(Error::Protocol(ProtocolError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        }));
    }

    let mut payload = vec![0u8; len as usize];
    read_exact(reader, &mut payload).await?;

    Ok(Message::from_payload(opcode, &payload)?)
}

/// Write one frame to a stream and flush it
///
/// Callers sharing a stream must serialize calls; the frame is written with
/// a single `write_all` but the transport does not guarantee atomicity.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let frame = encode_frame(msg);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_exact<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::ConnectionClosed
        } else {
            Error::Io(e)
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use cefpipe_core::{opcode, KeyModifiers, MouseButtons};

    #[tokio::test]
    async fn test_frame_roundtrip_all_variants() {
        let messages = [
            Message::Ping,
            Message::Shutdown,
            Message::FrameRequest,
            Message::MouseEvent {
                event_type: 1,
                x: 100,
                y: -3,
                buttons: MouseButtons::MIDDLE,
            },
            Message::MouseWheelEvent {
                x: 1,
                y: 2,
                delta: 120,
            },
            Message::KeyEvent {
                event_type: 0,
                key_code: 13,
                modifiers: KeyModifiers::SHIFT | KeyModifiers::ALT,
            },
            Message::KeyCharEvent {
                char_code: 'z' as i32,
                modifiers: KeyModifiers::NONE,
            },
        ];

        let mut buf = Vec::new();
        for msg in &messages {
            write_frame(&mut buf, msg).await.unwrap();
        }

        let mut cursor = Cursor::new(buf);
        for msg in &messages {
            assert_eq!(read_frame(&mut cursor).await.unwrap(), *msg);
        }
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_ping_frame_layout() {
        assert_eq!(encode_frame(&Message::Ping), vec![opcode::PING, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_closed() {
        let mut frame = encode_frame(&Message::MouseWheelEvent {
            x: 1,
            y: 2,
            delta: 3,
        });
        frame.truncate(frame.len() - 2);

        let mut cursor = Cursor::new(frame);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_unknown_opcode_skips_frame() {
        let mut buf = vec![0x7e, 0, 0, 0, 3, 9, 9, 9];
        buf.extend_from_slice(&encode_frame(&Message::FrameRequest));

        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnknownOpcode(0x7e))
        ));
        assert!(!err.is_fatal());

        // Stream is still aligned on the next frame
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Message::FrameRequest);
    }

    #[tokio::test]
    async fn test_length_mismatch_skips_frame() {
        let mut buf = vec![opcode::PING, 0, 0, 0, 2, 0xaa, 0xbb];
        buf.extend_from_slice(&encode_frame(&Message::Shutdown));

        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::PayloadLength { .. })
        ));
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Message::Shutdown);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut buf = vec![opcode::PING];
        buf.extend_from_slice(&(MAX_PAYLOAD_LEN + 1).to_be_bytes());

        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::PayloadTooLarge { .. })
        ));
        assert!(err.is_fatal());
    }
}
