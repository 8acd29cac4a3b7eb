//! Session lock and idle state from systemd-logind
//!
//! Polls the `LockedHint` and `IdleHint` properties of the caller's
//! session and reports changes to the service loop. The D-Bus calls are
//! blocking and run on the blocking pool.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zbus::blocking::Connection;
use zbus::zvariant::OwnedValue;

use crate::events::ControlMessage;

const LOGIND_BUS_NAME: &str = "org.freedesktop.login1";
const SESSION_PATH: &str = "/org/freedesktop/login1/session/auto";
const SESSION_INTERFACE: &str = "org.freedesktop.login1.Session";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Lock and display state of the user session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub locked: bool,
    pub interactive: bool,
}

impl SessionState {
    /// Derive the state from logind hints; an idle session has its display off
    pub fn from_hints(locked_hint: bool, idle_hint: bool) -> Self {
        Self {
            locked: locked_hint,
            interactive: !idle_hint,
        }
    }
}

/// Periodic logind reader
pub struct LogindPoller {
    control_tx: mpsc::Sender<ControlMessage>,
    interval: Duration,
}

impl LogindPoller {
    pub fn new(control_tx: mpsc::Sender<ControlMessage>, interval: Duration) -> Self {
        Self {
            control_tx,
            interval,
        }
    }

    /// Poll until the control channel closes
    ///
    /// Bus errors are logged and retried on the next tick.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut last: Option<SessionState> = None;
        let mut conn: Option<Connection> = None;
        let mut reported_error = false;

        info!(interval_ms = self.interval.as_millis() as u64, "logind poller started");

        loop {
            ticker.tick().await;

            let current = conn.clone();
            let result = tokio::task::spawn_blocking(move || -> zbus::Result<_> {
                let conn = match current {
                    Some(conn) => conn,
                    None => Connection::system()?,
                };
                let state = query_session(&conn)?;
                Ok((conn, state))
            })
            .await;

            let state = match result {
                Ok(Ok((connection, state))) => {
                    conn = Some(connection);
                    reported_error = false;
                    state
                }
                Ok(Err(e)) => {
                    conn = None;
                    if !reported_error {
                        warn!(error = %e, "failed to query logind session");
                        reported_error = true;
                    } else {
                        debug!(error = %e, "logind still unavailable");
                    }
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "logind query task failed");
                    continue;
                }
            };

            if last == Some(state) {
                continue;
            }
            debug!(?state, "session state changed");
            last = Some(state);

            if self.control_tx.send(ControlMessage::Session(state)).await.is_err() {
                break;
            }
        }

        info!("logind poller stopped");
    }
}

fn query_session(conn: &Connection) -> zbus::Result<SessionState> {
    let locked = read_bool(conn, "LockedHint")?;
    let idle = read_bool(conn, "IdleHint")?;
    Ok(SessionState::from_hints(locked, idle))
}

fn read_bool(conn: &Connection, property: &str) -> zbus::Result<bool> {
    let reply = conn.call_method(
        Some(LOGIND_BUS_NAME),
        SESSION_PATH,
        Some(PROPERTIES_INTERFACE),
        "Get",
        &(SESSION_INTERFACE, property),
    )?;
    let value: OwnedValue = reply.body().deserialize()?;
    Ok(bool::try_from(value)?)
}
