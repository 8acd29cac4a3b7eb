//! Known camera applications
//!
//! Matching is by exact app id (Wayland app_id, X11 WM_CLASS or Flatpak
//! id), ignoring ASCII case.

use std::collections::HashSet;

/// Camera apps recognised without any configuration
pub const DEFAULT_CAMERA_APPS: &[&str] = &[
    "org.gnome.Snapshot",
    "org.gnome.Cheese",
    "cheese",
    "snapshot",
    "guvcview",
    "kamoso",
    "org.kde.kamoso",
    "megapixels",
    "org.postmarketos.Megapixels",
    "com.obsproject.Studio",
    "obs",
    "webcamoid",
    "io.github.webcamoid.Webcamoid",
];

/// Set of app ids treated as camera apps
#[derive(Debug, Clone)]
pub struct CameraApps {
    ids: HashSet<String>,
}

impl CameraApps {
    /// Default set plus the given extra ids
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut apps = Self::default();
        for id in extra {
            apps.insert(id.as_ref());
        }
        apps
    }

    pub fn insert(&mut self, app_id: &str) {
        let id = app_id.trim();
        if !id.is_empty() {
            self.ids.insert(id.to_ascii_lowercase());
        }
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.ids.contains(&app_id.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for CameraApps {
    fn default() -> Self {
        Self {
            ids: DEFAULT_CAMERA_APPS
                .iter()
                .map(|id| id.to_ascii_lowercase())
                .collect(),
        }
    }
}
