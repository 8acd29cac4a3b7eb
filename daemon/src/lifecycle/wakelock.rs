//! Time-limited sleep inhibitor held through logind

use std::os::fd::OwnedFd;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};
use zbus::blocking::Connection;

const LOGIND_BUS_NAME: &str = "org.freedesktop.login1";
const MANAGER_PATH: &str = "/org/freedesktop/login1";
const MANAGER_INTERFACE: &str = "org.freedesktop.login1.Manager";

/// Holds a logind `sleep` inhibitor until released or timed out
///
/// The inhibitor lives as long as its file descriptor stays open.
pub struct WakeLock {
    fd: Arc<Mutex<Option<OwnedFd>>>,
}

impl WakeLock {
    /// Take the inhibitor and release it automatically after `timeout`
    pub async fn acquire(timeout: Duration) -> zbus::Result<Self> {
        let fd = tokio::task::spawn_blocking(inhibit_sleep)
            .await
            .map_err(|e| zbus::Error::Failure(e.to_string()))??;

        let lock = Self::from_fd(fd, timeout);
        info!(timeout_secs = timeout.as_secs(), "wake lock acquired");
        Ok(lock)
    }

    /// Hold an already-open inhibitor fd, closing it after `timeout`
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_fd(fd: OwnedFd, timeout: Duration) -> Self {
        let lock = Self {
            fd: Arc::new(Mutex::new(Some(fd))),
        };

        let held = Arc::clone(&lock.fd);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if release_fd(&held) {
                info!("wake lock expired");
            }
        });

        lock
    }

    pub fn is_held(&self) -> bool {
        self.fd.lock().map(|fd| fd.is_some()).unwrap_or(false)
    }

    /// Release the inhibitor; releasing twice is harmless
    pub fn release(&self) {
        if release_fd(&self.fd) {
            debug!("wake lock released");
        }
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn release_fd(fd: &Mutex<Option<OwnedFd>>) -> bool {
    match fd.lock() {
        Ok(mut fd) => fd.take().is_some(),
        Err(e) => {
            warn!(error = %e, "wake lock state poisoned");
            false
        }
    }
}

fn inhibit_sleep() -> zbus::Result<OwnedFd> {
    let conn = Connection::system()?;
    let reply = conn.call_method(
        Some(LOGIND_BUS_NAME),
        MANAGER_PATH,
        Some(MANAGER_INTERFACE),
        "Inhibit",
        &("sleep", "volkeyd", "Handling volume keys", "block"),
    )?;
    let fd = reply.body().deserialize::<zbus::zvariant::OwnedFd>()?;
    Ok(fd.into())
}
