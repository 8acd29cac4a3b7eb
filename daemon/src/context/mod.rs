//! Device context consulted by the dispatch guard
//!
//! Lock and display state come from logind (or IPC reports); the camera
//! flag follows foreground-app reports matched against `CameraApps`.

mod camera;
mod logind;

use serde::{Deserialize, Serialize};

pub use camera::{CameraApps, DEFAULT_CAMERA_APPS};
pub use logind::{LogindPoller, SessionState};

/// Snapshot of everything the guard looks at besides the mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    /// Session is locked
    pub locked: bool,
    /// Display is on and the user is active
    pub interactive: bool,
    /// Foreground app is a known camera app
    pub camera_active: bool,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            locked: false,
            interactive: true,
            camera_active: false,
        }
    }
}

impl DeviceContext {
    /// Apply a lock/display update, returning whether anything changed
    pub fn set_session(&mut self, state: SessionState) -> bool {
        let changed = self.locked != state.locked || self.interactive != state.interactive;
        self.locked = state.locked;
        self.interactive = state.interactive;
        changed
    }

    /// Apply a foreground-app report, returning the new camera flag
    pub fn set_foreground(&mut self, app_id: &str, cameras: &CameraApps) -> bool {
        self.camera_active = cameras.contains(app_id);
        self.camera_active
    }
}
