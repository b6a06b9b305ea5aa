//! cefpipe Network Library
//!
//! Host-side client for the local channel to an off-process browser render
//! worker.
//!
//! # Architecture
//!
//! - **Connection**: owns the duplex stream, drives connect/disconnect and
//!   serializes writes from any number of tasks
//! - **Inbound task**: one per live connection, decodes frames and publishes
//!   them to the event hub
//! - **Protocol**: `[opcode][u32 length][payload]` frames with fixed payloads
//!
//! # Usage
//!
//! ```ignore
//! let conn = Connection::new("browser-1");
//! conn.events().subscribe_messages(|msg| println!("worker sent {:?}", msg));
//!
//! conn.connect().await?;
//! conn.send_mouse_event(MouseEventType::Down, 10, 20, MouseButtons::LEFT).await;
//! conn.disconnect().await;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod hub;
pub mod stats;
pub mod transport;

pub use client::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use frame::{encode_frame, read_frame, write_frame, HEADER_LEN};
pub use hub::{EventHub, HubEvent, SubscriptionId};
pub use stats::{Statistics, StatsSnapshot};
pub use transport::{BoxStream, ConnectFuture, Connector, DuplexStream, LocalConnector};

pub use cefpipe_core::{
    ChannelName, ClientConfig, KeyEventType, KeyModifiers, Message, MouseButtons,
    MouseEventType, DEFAULT_CONNECT_TIMEOUT_MS,
};
