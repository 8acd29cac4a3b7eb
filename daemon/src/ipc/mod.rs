//! IPC module for daemon control and notifications

mod client;
mod protocol;
mod server;

pub use client::Client;
pub use protocol::{DaemonStatus, IpcError, Request, Response, MAX_FRAME_LEN};
pub use server::Server;
