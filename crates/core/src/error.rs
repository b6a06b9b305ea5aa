//! Error types for cefpipe core

use thiserror::Error;

/// Errors raised while interpreting a frame's opcode and payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Bad payload length for opcode {opcode:#04x}: expected {expected} bytes, got {actual}")]
    PayloadLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: u32, max: u32 },
}

/// Errors raised while loading client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
