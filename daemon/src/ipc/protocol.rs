//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::context::DeviceContext;
use crate::events::ServiceEvent;
use crate::mode::Mode;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from clients to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Select the remapping mode
    SetMode { mode: Mode },

    /// Report the focused application
    ForegroundChanged { app_id: String },

    /// Report lock and display state
    DeviceState { locked: bool, interactive: bool },

    /// Subscribe to service event notifications
    Subscribe,
}

/// Responses and notifications from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Mode change accepted
    ModeSet { mode: Mode },

    /// Report accepted
    Ack,

    /// Subscription confirmed; `event` frames follow
    Subscribed,

    /// Pushed to subscribed clients
    Event { event: ServiceEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Current mode
    pub mode: Mode,

    /// Lock, display and camera state
    pub context: DeviceContext,

    /// Number of grabbed input devices
    pub devices: usize,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: Mode::default(),
            context: DeviceContext::default(),
            devices: 0,
            uptime_secs: 0,
        }
    }
}

/// IPC transport errors
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),

    #[error("connection closed")]
    Closed,
}

/// Write one length-prefixed JSON frame
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(IpcError::FrameTooLarge(body.len()));
    }
    let len = (body.len() as u32).to_le_bytes();

    writer.write_all(&len).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed JSON frame
///
/// A clean end of stream before the length prefix is `IpcError::Closed`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, IpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(IpcError::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(IpcError::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}
