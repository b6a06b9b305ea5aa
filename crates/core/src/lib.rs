//! cefpipe Core Library
//!
//! Protocol model shared by the host-side pipe client: opcodes, messages and
//! their fixed payload schema, input event values, channel naming and client
//! configuration.

pub mod channel;
pub mod config;
pub mod error;
pub mod input;
pub mod protocol;

pub use channel::{ChannelName, CHANNEL_PREFIX, DEFAULT_CHANNEL};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT_MS};
pub use error::{ConfigError, ProtocolError, Result};
pub use input::{KeyEventType, KeyModifiers, MouseButtons, MouseEventType};
pub use protocol::{opcode, Message, MAX_PAYLOAD_LEN};
