//! Client side of the control socket

use std::path::Path;

use tokio::net::UnixStream;

use super::protocol::{read_frame, write_frame, IpcError, Request, Response};

/// A connection to a running daemon
pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub async fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self { stream })
    }

    /// Send a request and wait for its response
    pub async fn request(&mut self, request: &Request) -> Result<Response, IpcError> {
        write_frame(&mut self.stream, request).await?;
        self.next().await
    }

    /// Read the next frame, e.g. a pushed event after subscribing
    pub async fn next(&mut self) -> Result<Response, IpcError> {
        read_frame(&mut self.stream).await
    }
}
