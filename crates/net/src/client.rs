//! Pipe client for talking to the render worker
//!
//! One [`Connection`] owns one duplex stream. Any task may call [`Connection::send`];
//! writes are serialized behind the connection's write lock. A single inbound
//! task per live connection owns all reads and publishes decoded messages to
//! the [`EventHub`].

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cefpipe_core::{
    ChannelName, ClientConfig, KeyEventType, KeyModifiers, Message, MouseButtons,
    MouseEventType,
};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::hub::EventHub;
use crate::stats::Statistics;
use crate::transport::{BoxStream, Connector, LocalConnector};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client end of a worker channel
pub struct Connection {
    channel: ChannelName,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    /// Serializes connect/disconnect and owns the inbound task
    lifecycle: Mutex<Option<InboundTask>>,
}

/// State reachable from both the caller side and the inbound task
struct Shared {
    channel: ChannelName,
    state: RwLock<ConnectionState>,
    /// Write half of the stream; holding the lock is the write guard
    writer: Mutex<Option<WriteHalf<BoxStream>>>,
    /// Raised on teardown so in-flight sends give up the write guard
    closing: watch::Sender<bool>,
    hub: EventHub,
    stats: Statistics,
}

impl Shared {
    async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Move to `Disconnected`. Returns true if this call performed the transition.
    async fn mark_disconnected(&self) -> bool {
        let mut state = self.state.write().await;
        let was_live = *state != ConnectionState::Disconnected;
        *state = ConnectionState::Disconnected;
        self.closing.send_replace(true);
        was_live
    }

    /// Drop the write half. Close errors are swallowed.
    async fn release_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(channel = %self.channel, error = %e, "Error while closing stream");
            }
        }
    }
}

struct InboundTask {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl InboundTask {
    fn spawn(reader: ReadHalf<BoxStream>, shared: Arc<Shared>, backoff: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(inbound_loop(reader, shared, shutdown_rx, backoff));
        Self {
            handle,
            shutdown_tx,
        }
    }

    /// Signal the task and wait for it, aborting it after `grace`
    async fn stop(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);
        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Inbound task failed"),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Inbound task did not stop, aborting");
                handle.abort();
            }
        }
    }
}

impl Connection {
    /// Create a client for a channel with default settings
    pub fn new(channel: &str) -> Self {
        Self::with_config(ClientConfig {
            channel: channel.to_string(),
            ..ClientConfig::default()
        })
    }

    /// Create a client using the platform's local transport
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(LocalConnector::default()))
    }

    /// Create a client over a custom transport
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let channel = config.channel_name();
        Self {
            channel: channel.clone(),
            config,
            connector,
            shared: Arc::new(Shared {
                channel,
                state: RwLock::new(ConnectionState::Disconnected),
                writer: Mutex::new(None),
                closing: watch::channel(false).0,
                hub: EventHub::new(),
                stats: Statistics::default(),
            }),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Subscriber registry for state changes and received messages
    pub fn events(&self) -> &EventHub {
        &self.shared.hub
    }

    pub fn stats(&self) -> &Statistics {
        &self.shared.stats
    }

    pub async fn state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.is_connected().await
    }

    /// Whether an inbound task is still running
    pub async fn inbound_active(&self) -> bool {
        self.lifecycle
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Connect using the configured timeout
    pub async fn connect(&self) -> Result<()> {
        self.connect_with_timeout(self.config.connect_timeout()).await
    }

    /// Connect to the worker, waiting at most `timeout` for it to accept
    ///
    /// Does nothing if already connected. On success, publishes
    /// `ConnectionStateChanged(true)`, sends a `Ping` and a `FrameRequest`,
    /// then starts the inbound task. On failure the connection is left
    /// `Disconnected`, `ConnectionStateChanged(false)` is published and
    /// [`Error::ConnectFailure`] is returned.
    pub async fn connect_with_timeout(&self, timeout: Duration) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        if self.shared.is_connected().await {
            debug!(channel = %self.channel, "Already connected");
            return Ok(());
        }

        // A previous inbound task may have ended on its own after a read failure
        if let Some(task) = lifecycle.take() {
            task.stop(self.config.join_timeout()).await;
        }

        *self.shared.state.write().await = ConnectionState::Connecting;
        info!(
            channel = %self.channel,
            timeout_ms = timeout.as_millis() as u64,
            "Connecting to worker"
        );

        // Dropping the connect future on timeout disposes any half-open stream
        let opened = match tokio::time::timeout(timeout, self.connector.connect(&self.channel)).await
        {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("worker did not accept within {}ms", timeout.as_millis()),
            )),
        };

        let stream = match opened {
            Ok(stream) => stream,
            Err(source) => {
                *self.shared.state.write().await = ConnectionState::Disconnected;
                warn!(channel = %self.channel, error = %source, "Connect failed");
                self.shared.hub.publish_state(false);
                return Err(Error::ConnectFailure {
                    channel: self.channel.clone(),
                    source,
                });
            }
        };

        let (reader, writer) = tokio::io::split(stream);
        *self.shared.writer.lock().await = Some(writer);
        self.shared.closing.send_replace(false);
        *self.shared.state.write().await = ConnectionState::Connected;

        info!(channel = %self.channel, "Connected to worker");
        self.shared.hub.publish_state(true);

        if !self.send(Message::Ping).await {
            warn!(channel = %self.channel, "Initial ping failed");
        }
        self.send_repaint_request().await;

        *lifecycle = Some(InboundTask::spawn(
            reader,
            self.shared.clone(),
            self.config.recoverable_backoff(),
        ));

        Ok(())
    }

    /// Tear down the connection
    ///
    /// Idempotent. Stops the inbound task, releases the stream and publishes
    /// `ConnectionStateChanged(false)` if there was a live connection.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        let was_live = self.shared.mark_disconnected().await;

        if let Some(task) = lifecycle.take() {
            task.stop(self.config.join_timeout()).await;
        }

        self.shared.release_writer().await;

        if was_live {
            info!(channel = %self.channel, "Disconnected from worker");
            self.shared.hub.publish_state(false);
        }
    }

    /// Send a message to the worker
    ///
    /// Returns false if not connected or if the write fails. A failed write
    /// does not disconnect; the inbound task notices the broken stream.
    /// Teardown cancels a send that is waiting for the write guard or stuck
    /// in a write, and that send returns false.
    pub async fn send(&self, msg: Message) -> bool {
        let mut closing = self.shared.closing.subscribe();
        if !self.shared.is_connected().await {
            return false;
        }

        let written = tokio::select! {
            biased;

            _ = closing.wait_for(|closing| *closing) => {
                debug!(opcode = msg.opcode(), "Send cancelled by disconnect");
                return false;
            }

            result = async {
                let mut writer = self.shared.writer.lock().await;
                match writer.as_mut() {
                    Some(stream) => Some(write_frame(stream, &msg).await),
                    None => None,
                }
            } => result,
        };

        match written {
            None => false,
            Some(Ok(())) => {
                self.shared.stats.record_sent();
                debug!(opcode = msg.opcode(), "Sent message");
                true
            }
            Some(Err(e)) => {
                warn!(
                    channel = %self.channel,
                    opcode = msg.opcode(),
                    error = %e,
                    "Send message failure"
                );
                false
            }
        }
    }

    pub async fn send_mouse_event(
        &self,
        event_type: MouseEventType,
        x: i32,
        y: i32,
        buttons: MouseButtons,
    ) -> bool {
        self.send(Message::MouseEvent {
            event_type: event_type.into(),
            x,
            y,
            buttons,
        })
        .await
    }

    pub async fn send_mouse_wheel_event(&self, x: i32, y: i32, delta: i32) -> bool {
        self.send(Message::MouseWheelEvent { x, y, delta }).await
    }

    pub async fn send_key_event(
        &self,
        event_type: KeyEventType,
        key_code: u32,
        modifiers: KeyModifiers,
    ) -> bool {
        self.send(Message::KeyEvent {
            event_type: event_type.into(),
            key_code,
            modifiers,
        })
        .await
    }

    pub async fn send_key_char_event(&self, char_code: i32, modifiers: KeyModifiers) -> bool {
        self.send(Message::KeyCharEvent {
            char_code,
            modifiers,
        })
        .await
    }

    /// Ask the worker process to exit
    pub async fn send_shutdown(&self) -> bool {
        self.send(Message::Shutdown).await
    }

    pub async fn send_repaint_request(&self) -> bool {
        self.send(Message::FrameRequest).await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The task exits on its own once signalled and releases the stream
        if let Some(task) = self.lifecycle.get_mut().take() {
            let _ = task.shutdown_tx.send(true);
        }
    }
}

/// Read frames until the connection drops or shutdown is signalled
async fn inbound_loop(
    mut reader: ReadHalf<BoxStream>,
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
    backoff: Duration,
) {
    loop {
        let stop = *shutdown_rx.borrow();
        if stop || !shared.is_connected().await {
            break;
        }
        shared.stats.record_iteration();

        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => break,

            result = read_frame(&mut reader) => match result {
                Ok(msg) => {
                    debug!(opcode = msg.opcode(), "Received message");
                    shared.stats.record_received();
                    shared.hub.publish_message(&msg);
                }
                Err(e) if e.is_fatal() => {
                    if shared.mark_disconnected().await {
                        info!(channel = %shared.channel, error = %e, "Worker connection lost");
                        shared.release_writer().await;
                        shared.hub.publish_state(false);
                    }
                    break;
                }
                Err(e) => {
                    shared.stats.record_dropped();
                    warn!(channel = %shared.channel, error = %e, "Dropped malformed frame");
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }

    debug!(channel = %shared.channel, "Inbound loop stopped");
}
