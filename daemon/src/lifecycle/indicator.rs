//! Persistent desktop notification shown while the daemon runs

use notify_rust::{Hint, Notification, NotificationHandle, Timeout};
use tracing::{debug, info, warn};

const APP_NAME: &str = "volkeyd";
const SUMMARY: &str = "Volume Key Control Active";
const BODY: &str = "Controlling media with volume keys.";

/// The "service is running" notification
pub struct ServiceIndicator {
    handle: Option<NotificationHandle>,
}

impl ServiceIndicator {
    /// Show the notification
    ///
    /// Failures are logged; the daemon runs without an indicator.
    pub async fn show() -> Self {
        let result = tokio::task::spawn_blocking(|| {
            Notification::new()
                .appname(APP_NAME)
                .summary(SUMMARY)
                .body(BODY)
                .icon("audio-volume-high")
                .hint(Hint::Resident(true))
                .timeout(Timeout::Never)
                .show()
        })
        .await;

        let handle = match result {
            Ok(Ok(handle)) => {
                info!("service indicator shown");
                Some(handle)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to show service indicator");
                None
            }
            Err(e) => {
                warn!(error = %e, "service indicator task failed");
                None
            }
        };

        Self { handle }
    }

    /// An indicator that shows nothing
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_shown(&self) -> bool {
        self.handle.is_some()
    }

    /// Remove the notification; a second call does nothing
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            debug!("service indicator closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_close_is_noop() {
        let mut indicator = ServiceIndicator::disabled();
        assert!(!indicator.is_shown());
        indicator.close();
        indicator.close();
        assert!(!indicator.is_shown());
    }
}
