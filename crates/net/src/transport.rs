//! Local duplex transport
//!
//! A [`Connector`] opens the byte stream for a channel. [`LocalConnector`]
//! maps channel names onto the platform's local IPC primitive: a Unix domain
//! socket on Unix, a named pipe on Windows.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use cefpipe_core::ChannelName;

/// A bidirectional byte stream usable from any task
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized> DuplexStream for T {}

/// Owned, type-erased duplex stream
pub type BoxStream = Box<dyn DuplexStream>;

/// Future returned by [`Connector::connect`]
pub type ConnectFuture<'a> = Pin<Box<dyn Future<Output = io::Result<BoxStream>> + Send + 'a>>;

/// Opens duplex streams to named channels
///
/// The returned future may be dropped at any point (connect timeout); it must
/// not leave a half-open stream behind when that happens.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, channel: &'a ChannelName) -> ConnectFuture<'a>;
}

/// Connector for the platform's local IPC channels
#[derive(Debug, Clone)]
pub struct LocalConnector {
    #[cfg_attr(windows, allow(dead_code))]
    socket_dir: PathBuf,
}

impl Default for LocalConnector {
    fn default() -> Self {
        Self {
            socket_dir: std::env::temp_dir(),
        }
    }
}

impl LocalConnector {
    /// Look for Unix sockets in `dir` instead of the system temp directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: dir.into(),
        }
    }

    /// Socket path a channel resolves to
    #[cfg(unix)]
    pub fn socket_path(&self, channel: &ChannelName) -> PathBuf {
        self.socket_dir.join(channel.as_str())
    }

    /// Pipe path a channel resolves to
    #[cfg(windows)]
    pub fn pipe_path(&self, channel: &ChannelName) -> String {
        format!(r"\\.\pipe\{}", channel)
    }
}

impl Connector for LocalConnector {
    #[cfg(unix)]
    fn connect<'a>(&'a self, channel: &'a ChannelName) -> ConnectFuture<'a> {
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(self.socket_path(channel)).await?;
            Ok::<BoxStream, io::Error>(Box::new(stream))
        })
    }

    #[cfg(windows)]
    fn connect<'a>(&'a self, channel: &'a ChannelName) -> ConnectFuture<'a> {
        use std::time::Duration;
        use tokio::net::windows::named_pipe::ClientOptions;

        // Win32 ERROR_PIPE_BUSY: every server instance is taken, retry
        const ERROR_PIPE_BUSY: i32 = 231;
        const BUSY_RETRY: Duration = Duration::from_millis(50);

        let path = self.pipe_path(channel);
        Box::pin(async move {
            loop {
                match ClientOptions::new().open(&path) {
                    Ok(client) => return Ok(Box::new(client) as BoxStream),
                    Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {}
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(BUSY_RETRY).await;
            }
        })
    }
}
