//! Pipe protocol message types
//!
//! Each message is identified on the wire by a one-byte opcode. The opcode
//! fixes the payload shape; all integers are big-endian.
//!
//! | Opcode | Message           | Payload                                      |
//! |--------|-------------------|----------------------------------------------|
//! | `0x01` | `Ping`            | empty                                        |
//! | `0x02` | `Shutdown`        | empty                                        |
//! | `0x03` | `FrameRequest`    | empty                                        |
//! | `0x10` | `MouseEvent`      | type `u8`, x `i32`, y `i32`, buttons `u32`   |
//! | `0x11` | `MouseWheelEvent` | x `i32`, y `i32`, delta `i32`                |
//! | `0x12` | `KeyEvent`        | type `u8`, key code `u32`, modifiers `u32`   |
//! | `0x13` | `KeyCharEvent`    | char code `i32`, modifiers `u32`             |

use crate::error::{ProtocolError, Result};
use crate::input::{KeyModifiers, MouseButtons};

/// Wire opcodes, stable across client and worker versions
pub mod opcode {
    pub const PING: u8 = 0x01;
    pub const SHUTDOWN: u8 = 0x02;
    pub const FRAME: u8 = 0x03;
    pub const MOUSE_EVENT: u8 = 0x10;
    pub const MOUSE_WHEEL_EVENT: u8 = 0x11;
    pub const KEY_EVENT: u8 = 0x12;
    pub const KEY_CHAR_EVENT: u8 = 0x13;
}

/// Largest payload length a frame may declare (64KB)
pub const MAX_PAYLOAD_LEN: u32 = 64 * 1024;

/// Protocol messages exchanged with the render worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Liveness probe, sent once after connecting
    Ping,

    /// Ask the worker to shut down
    Shutdown,

    /// Ask the worker to repaint
    FrameRequest,

    MouseEvent {
        event_type: u8,
        x: i32,
        y: i32,
        buttons: MouseButtons,
    },

    MouseWheelEvent { x: i32, y: i32, delta: i32 },

    KeyEvent {
        event_type: u8,
        key_code: u32,
        modifiers: KeyModifiers,
    },

    /// Character input (key code replaced by a character code)
    KeyCharEvent {
        char_code: i32,
        modifiers: KeyModifiers,
    },
}

impl Message {
    /// Opcode identifying this message on the wire
    pub fn opcode(&self) -> u8 {
        match self {
            Message::Ping => opcode::PING,
            Message::Shutdown => opcode::SHUTDOWN,
            Message::FrameRequest => opcode::FRAME,
            Message::MouseEvent { .. } => opcode::MOUSE_EVENT,
            Message::MouseWheelEvent { .. } => opcode::MOUSE_WHEEL_EVENT,
            Message::KeyEvent { .. } => opcode::KEY_EVENT,
            Message::KeyCharEvent { .. } => opcode::KEY_CHAR_EVENT,
        }
    }

    /// Fixed payload size for an opcode, or `None` if the opcode is unknown
    pub fn payload_len(opcode: u8) -> Option<usize> {
        match opcode {
            opcode::PING | opcode::SHUTDOWN | opcode::FRAME => Some(0),
            opcode::MOUSE_EVENT => Some(13),
            opcode::MOUSE_WHEEL_EVENT => Some(12),
            opcode::KEY_EVENT => Some(9),
            opcode::KEY_CHAR_EVENT => Some(8),
            _ => None,
        }
    }

    /// Serialize the payload fields (opcode and length prefix excluded)
    pub fn to_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::payload_len(self.opcode()).unwrap_or(0));
        match *self {
            Message::Ping | Message::Shutdown | Message::FrameRequest => {}
            Message::MouseEvent {
                event_type,
                x,
                y,
                buttons,
            } => {
                buf.push(event_type);
                buf.extend_from_slice(&x.to_be_bytes());
                buf.extend_from_slice(&y.to_be_bytes());
                buf.extend_from_slice(&buttons.bits().to_be_bytes());
            }
            Message::MouseWheelEvent { x, y, delta } => {
                buf.extend_from_slice(&x.to_be_bytes());
                buf.extend_from_slice(&y.to_be_bytes());
                buf.extend_from_slice(&delta.to_be_bytes());
            }
            Message::KeyEvent {
                event_type,
                key_code,
                modifiers,
            } => {
                buf.push(event_type);
                buf.extend_from_slice(&key_code.to_be_bytes());
                buf.extend_from_slice(&modifiers.bits().to_be_bytes());
            }
            Message::KeyCharEvent {
                char_code,
                modifiers,
            } => {
                buf.extend_from_slice(&char_code.to_be_bytes());
                buf.extend_from_slice(&modifiers.bits().to_be_bytes());
            }
        }
        buf
    }

    /// Parse a payload for the given opcode
    ///
    /// Rejects unknown opcodes and payloads whose length differs from the
    /// opcode's fixed size.
    pub fn from_payload(opcode: u8, payload: &[u8]) -> Result<Self> {
        let expected = Self::payload_len(opcode).ok_or(ProtocolError::UnknownOpcode(opcode))?;
        let actual = payload.len();
        let bad_length = || ProtocolError::PayloadLength {
            opcode,
            expected,
            actual,
        };
        if actual != expected {
            return Err(bad_length());
        }

        let mut r = PayloadReader { buf: payload };
        let msg = match opcode {
            opcode::PING => Message::Ping,
            opcode::SHUTDOWN => Message::Shutdown,
            opcode::FRAME => Message::FrameRequest,
            opcode::MOUSE_EVENT => Message::MouseEvent {
                event_type: r.u8().ok_or_else(bad_length)?,
                x: r.i32().ok_or_else(bad_length)?,
                y: r.i32().ok_or_else(bad_length)?,
                buttons: MouseButtons::from_bits(r.u32().ok_or_else(bad_length)?),
            },
            opcode::MOUSE_WHEEL_EVENT => Message::MouseWheelEvent {
                x: r.i32().ok_or_else(bad_length)?,
                y: r.i32().ok_or_else(bad_length)?,
                delta: r.i32().ok_or_else(bad_length)?,
            },
            opcode::KEY_EVENT => Message::KeyEvent {
                event_type: r.u8().ok_or_else(bad_length)?,
                key_code: r.u32().ok_or_else(bad_length)?,
                modifiers: KeyModifiers::from_bits(r.u32().ok_or_else(bad_length)?),
            },
            opcode::KEY_CHAR_EVENT => Message::KeyCharEvent {
                char_code: r.i32().ok_or_else(bad_length)?,
                modifiers: KeyModifiers::from_bits(r.u32().ok_or_else(bad_length)?),
            },
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        Ok(msg)
    }
}

/// Sequential big-endian field reader over a payload slice
struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl PayloadReader<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let (head, rest) = self.buf.split_first_chunk::<N>()?;
        self.buf = rest;
        Some(*head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn i32(&mut self) -> Option<i32> {
        self.take::<4>().map(i32::from_be_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take::<4>().map(u32::from_be_bytes)
    }
}
