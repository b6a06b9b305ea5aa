//! Channel naming
//!
//! Every channel lives under a fixed namespace prefix so the host and the
//! render worker agree on the name without sharing configuration.

use std::fmt;

/// Namespace prefix applied to every channel name
pub const CHANNEL_PREFIX: &str = "cefpipe_";

/// Suffix used when the caller does not pick one
pub const DEFAULT_CHANNEL: &str = "default";

/// Fully-qualified channel name (always carries [`CHANNEL_PREFIX`])
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Build a channel name, adding the namespace prefix if it is missing
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.starts_with(CHANNEL_PREFIX) {
            Self(name)
        } else {
            Self(format!("{}{}", CHANNEL_PREFIX, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelName {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
