//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::context::CameraApps;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Key-value file holding the persisted mode
    pub prefs_path: PathBuf,

    /// App ids treated as camera apps in addition to the built-in set
    pub extra_camera_apps: Vec<String>,

    /// Poll logind for lock and idle state
    pub logind: bool,

    /// How often logind is polled
    pub logind_interval: Duration,

    /// Show the persistent "service active" notification
    pub indicator: bool,

    /// How long the sleep inhibitor is held after start; zero disables it
    pub wake_lock: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match var("VOLKEYD_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = var("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("volkeyd")
            }
        };

        let extra_camera_apps = var("VOLKEYD_CAMERA_APPS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let wake_lock_secs = match var("VOLKEYD_WAKE_LOCK_SECS") {
            Some(secs) => secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid VOLKEYD_WAKE_LOCK_SECS: {secs}"))?,
            None => 600,
        };

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            prefs_path: data_dir.join("prefs.json"),
            data_dir,
            extra_camera_apps,
            logind: flag(var("VOLKEYD_LOGIND")),
            logind_interval: Duration::from_millis(500),
            indicator: flag(var("VOLKEYD_INDICATOR")),
            wake_lock: Duration::from_secs(wake_lock_secs),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {:?}", self.data_dir))?;
        Ok(())
    }

    /// Known camera apps including the configured extras
    pub fn camera_apps(&self) -> CameraApps {
        CameraApps::with_extra(&self.extra_camera_apps)
    }
}

/// Boolean switch that is on unless set to 0/false/no/off
fn flag(value: Option<String>) -> bool {
    match value {
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load_with(&[("HOME", "/home/user")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/user/.local/share/volkeyd/daemon.sock")
        );
        assert!(config.prefs_path.ends_with("prefs.json"));
        assert!(config.logind);
        assert!(config.indicator);
        assert_eq!(config.wake_lock, Duration::from_secs(600));
        assert!(config.extra_camera_apps.is_empty());
    }

    #[test]
    fn test_config_overrides() {
        let config = load_with(&[
            ("VOLKEYD_DATA_DIR", "/run/volkeyd"),
            ("VOLKEYD_CAMERA_APPS", "com.example.Cam, ,other"),
            ("VOLKEYD_LOGIND", "0"),
            ("VOLKEYD_INDICATOR", "off"),
            ("VOLKEYD_WAKE_LOCK_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/run/volkeyd/daemon.sock"));
        assert_eq!(config.extra_camera_apps, vec!["com.example.Cam", "other"]);
        assert!(!config.logind);
        assert!(!config.indicator);
        assert!(config.wake_lock.is_zero());
        assert!(config.camera_apps().contains("com.example.cam"));
    }

    #[test]
    fn test_config_requires_home_without_data_dir() {
        assert!(load_with(&[]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("VOLKEYD_WAKE_LOCK_SECS", "ten")]).is_err());
    }
}
