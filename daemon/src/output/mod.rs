//! Action output: volume steps, media transport keys and pass-through
//!
//! `MediaOutput` is the seam between the service loop and the platform.
//! The daemon uses a uinput virtual device; tests use a recorder.

mod uinput;

use evdev::{InputEvent, Key};
use serde::{Deserialize, Serialize};

use crate::hotkey::{KeyAction, VolumeKey};

pub use uinput::{VirtualKeypad, VIRTUAL_DEVICE_NAME};

/// Media transport command sent on a long press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCommand {
    Next,
    Previous,
}

impl MediaCommand {
    /// Volume up skips forward, volume down skips back
    pub fn for_key(key: VolumeKey) -> Self {
        match key {
            VolumeKey::Up => MediaCommand::Next,
            VolumeKey::Down => MediaCommand::Previous,
        }
    }

    pub fn key(&self) -> Key {
        match self {
            MediaCommand::Next => Key::KEY_NEXTSONG,
            MediaCommand::Previous => Key::KEY_PREVIOUSSONG,
        }
    }
}

impl std::fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaCommand::Next => write!(f, "MEDIA_NEXT"),
            MediaCommand::Previous => write!(f, "MEDIA_PREVIOUS"),
        }
    }
}

/// Direction of a media volume step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Raise,
    Lower,
}

/// One notch of media volume change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStep {
    pub direction: VolumeDirection,
    /// Show the volume feedback overlay
    pub show_ui: bool,
}

impl VolumeStep {
    /// Step for a short press, always with feedback shown
    pub fn for_key(key: VolumeKey) -> Self {
        let direction = match key {
            VolumeKey::Up => VolumeDirection::Raise,
            VolumeKey::Down => VolumeDirection::Lower,
        };
        Self {
            direction,
            show_ui: true,
        }
    }
}

/// Errors from the output device
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to create virtual device: {0}")]
    Create(#[source] std::io::Error),

    #[error("failed to emit {what}: {source}")]
    Emit {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

/// Platform sink for everything the service produces
pub trait MediaOutput {
    /// Step the media stream volume
    fn adjust_volume(&mut self, step: VolumeStep) -> Result<(), OutputError>;

    /// Send a media transport key (down then up)
    fn media_command(&mut self, command: MediaCommand) -> Result<(), OutputError>;

    /// Re-emit a volume key transition unchanged
    fn pass_through(&mut self, key: VolumeKey, action: KeyAction) -> Result<(), OutputError>;

    /// Re-emit unrelated key events from a grabbed device
    fn forward(&mut self, events: &[InputEvent]) -> Result<(), OutputError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_command_for_key() {
        assert_eq!(MediaCommand::for_key(VolumeKey::Up), MediaCommand::Next);
        assert_eq!(MediaCommand::for_key(VolumeKey::Down), MediaCommand::Previous);
        assert_eq!(MediaCommand::Next.key(), Key::KEY_NEXTSONG);
    }

    #[test]
    fn test_volume_step_shows_ui() {
        let step = VolumeStep::for_key(VolumeKey::Down);
        assert_eq!(step.direction, VolumeDirection::Lower);
        assert!(step.show_ui);
    }
}
