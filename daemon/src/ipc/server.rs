//! Unix domain socket server for IPC
//!
//! Answers requests, forwards configuration and context reports to the
//! service loop, and pushes service events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::context::SessionState;
use crate::events::{ControlMessage, ServiceEvent};
use crate::mode::Mode;

use super::protocol::{read_frame, write_frame, DaemonStatus, IpcError, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with client handlers
struct Shared {
    status: RwLock<ServerState>,
    control_tx: mpsc::Sender<ControlMessage>,
    event_tx: broadcast::Sender<ServiceEvent>,
}

struct ServerState {
    status: DaemonStatus,
    start_time: std::time::Instant,
}

impl Server {
    /// Bind the socket and prepare the server
    pub fn new(
        socket_path: &Path,
        control_tx: mpsc::Sender<ControlMessage>,
        event_tx: broadcast::Sender<ServiceEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(Shared {
            status: RwLock::new(ServerState {
                status: DaemonStatus::default(),
                start_time: std::time::Instant::now(),
            }),
            control_tx,
            event_tx,
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared,
            shutdown_tx,
        })
    }

    /// Set the initial status snapshot
    pub async fn set_initial(&self, mode: Mode, devices: usize) {
        let mut state = self.shared.status.write().await;
        state.status.mode = mode;
        state.status.devices = devices;
    }

    /// Fold a service event into the status snapshot
    pub async fn apply_event(&self, event: &ServiceEvent) {
        let mut state = self.shared.status.write().await;
        match event {
            ServiceEvent::ModeChanged { mode, previous } => {
                state.status.mode = *mode;
                if mode != previous {
                    info!(from = %previous, to = %mode, "IPC server: mode updated");
                }
            }
            ServiceEvent::ForegroundChanged { camera_active, .. } => {
                state.status.context.camera_active = *camera_active;
            }
            ServiceEvent::SessionChanged {
                locked,
                interactive,
            } => {
                state.status.context.locked = *locked;
                state.status.context.interactive = *interactive;
            }
            _ => {}
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(error = %e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(error = %e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

impl Shared {
    async fn snapshot(&self) -> DaemonStatus {
        let mut state = self.status.write().await;
        state.status.uptime_secs = state.start_time.elapsed().as_secs();
        state.status.clone()
    }

    async fn forward(&self, message: ControlMessage) -> Response {
        match self.control_tx.send(message).await {
            Ok(()) => Response::Ack,
            Err(_) => Response::error("service_stopped", "service loop is not running"),
        }
    }

    /// Process a request and return a response
    async fn process_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(self.snapshot().await),

            Request::SetMode { mode } => {
                info!(%mode, "mode change requested via IPC");
                match self.forward(ControlMessage::SetMode(mode)).await {
                    Response::Ack => Response::ModeSet { mode },
                    other => other,
                }
            }

            Request::ForegroundChanged { app_id } => {
                if app_id.trim().is_empty() {
                    return Response::error("invalid_app_id", "app_id must not be empty");
                }
                self.forward(ControlMessage::ForegroundChanged { app_id })
                    .await
            }

            Request::DeviceState {
                locked,
                interactive,
            } => {
                self.forward(ControlMessage::Session(SessionState {
                    locked,
                    interactive,
                }))
                .await
            }

            // Handled by the connection loop
            Request::Subscribe => Response::Subscribed,
        }
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<(), IpcError> {
    let (mut reader, mut writer) = stream.into_split();

    // Frames are read on their own task so that waiting for the next
    // request never races a partially read frame against pushed events
    let (request_tx, mut request_rx) = mpsc::channel::<Result<Request, IpcError>>(8);
    let read_task = tokio::spawn(async move {
        loop {
            let frame = read_frame::<_, Request>(&mut reader).await;
            let done = frame.is_err();
            if request_tx.send(frame).await.is_err() || done {
                break;
            }
        }
    });

    let mut events: Option<broadcast::Receiver<ServiceEvent>> = None;
    let result = loop {
        tokio::select! {
            frame = request_rx.recv() => {
                let request = match frame {
                    Some(Ok(request)) => request,
                    Some(Err(IpcError::Closed)) | None => {
                        debug!("client disconnected");
                        break Ok(());
                    }
                    Some(Err(IpcError::Json(e))) => {
                        let response = Response::error("invalid_request", e.to_string());
                        if let Err(e) = write_frame(&mut writer, &response).await {
                            break Err(e);
                        }
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(e),
                };

                debug!(?request, "received request");
                if request == Request::Subscribe && events.is_none() {
                    events = Some(shared.event_tx.subscribe());
                    debug!("client subscribed to notifications");
                }

                let response = shared.process_request(request).await;
                if let Err(e) = write_frame(&mut writer, &response).await {
                    break Err(e);
                }
            }
            event = next_event(&mut events) => {
                if let Err(e) = push_event(&mut writer, event).await {
                    break Err(e);
                }
            }
        }
    };

    read_task.abort();
    result
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<ServiceEvent>>,
) -> Result<ServiceEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn push_event(
    writer: &mut OwnedWriteHalf,
    event: Result<ServiceEvent, broadcast::error::RecvError>,
) -> Result<(), IpcError> {
    match event {
        Ok(event) => write_frame(writer, &Response::Event { event }).await,
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(skipped = n, "subscriber lagged");
            Ok(())
        }
        Err(broadcast::error::RecvError::Closed) => Err(IpcError::Closed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::VolumeKey;
    use crate::ipc::Client;

    struct Fixture {
        server: Arc<Server>,
        control_rx: mpsc::Receiver<ControlMessage>,
        event_tx: broadcast::Sender<ServiceEvent>,
        socket: PathBuf,
        _dir: tempfile::TempDir,
    }

    fn start_server() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("daemon.sock");
        let (control_tx, control_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(16);

        let server = Arc::new(Server::new(&socket, control_tx, event_tx.clone()).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = running.run().await;
        });

        Fixture {
            server,
            control_rx,
            event_tx,
            socket,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let fx = start_server();
        let mut client = Client::connect(&fx.socket).await.unwrap();
        assert_eq!(client.request(&Request::Ping).await.unwrap(), Response::Pong);
    }

    #[tokio::test]
    async fn test_set_mode_reaches_service() {
        let mut fx = start_server();
        let mut client = Client::connect(&fx.socket).await.unwrap();

        let resp = client
            .request(&Request::SetMode { mode: Mode::Active })
            .await
            .unwrap();
        assert_eq!(resp, Response::ModeSet { mode: Mode::Active });
        assert_eq!(
            fx.control_rx.recv().await,
            Some(ControlMessage::SetMode(Mode::Active))
        );
    }

    #[tokio::test]
    async fn test_reports_are_forwarded() {
        let mut fx = start_server();
        let mut client = Client::connect(&fx.socket).await.unwrap();

        let resp = client
            .request(&Request::ForegroundChanged {
                app_id: "org.gnome.Snapshot".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(resp, Response::Ack);
        assert_eq!(
            fx.control_rx.recv().await,
            Some(ControlMessage::ForegroundChanged {
                app_id: "org.gnome.Snapshot".to_string()
            })
        );

        let resp = client
            .request(&Request::ForegroundChanged {
                app_id: "  ".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(resp, Response::Error { .. }));
    }

    #[tokio::test]
    async fn test_status_reflects_events() {
        let fx = start_server();
        fx.server.set_initial(Mode::Off, 2).await;
        fx.server
            .apply_event(&ServiceEvent::ModeChanged {
                mode: Mode::Background,
                previous: Mode::Off,
            })
            .await;
        fx.server
            .apply_event(&ServiceEvent::SessionChanged {
                locked: true,
                interactive: false,
            })
            .await;

        let mut client = Client::connect(&fx.socket).await.unwrap();
        let Response::Status(status) = client.request(&Request::GetStatus).await.unwrap() else {
            panic!("expected status");
        };
        assert_eq!(status.mode, Mode::Background);
        assert_eq!(status.devices, 2);
        assert!(status.context.locked);
        assert!(!status.context.interactive);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let fx = start_server();
        let mut client = Client::connect(&fx.socket).await.unwrap();
        assert_eq!(
            client.request(&Request::Subscribe).await.unwrap(),
            Response::Subscribed
        );

        let event = ServiceEvent::PassedThrough { key: VolumeKey::Up };
        fx.event_tx.send(event.clone()).unwrap();

        assert_eq!(client.next().await.unwrap(), Response::Event { event });
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let fx = start_server();
        assert!(fx.socket.exists());
        fx.server.shutdown().await;
        assert!(!fx.socket.exists());
    }
}
