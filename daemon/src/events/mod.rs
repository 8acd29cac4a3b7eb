//! Messages flowing into and out of the service loop
//!
//! `ControlMessage` carries configuration and context updates in;
//! `ServiceEvent` reports what the service did to IPC subscribers.

use serde::{Deserialize, Serialize};

use crate::context::SessionState;
use crate::hotkey::VolumeKey;
use crate::mode::Mode;
use crate::output::MediaCommand;
use crate::state::PressKind;

/// Updates delivered to the service loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// User selected a new mode
    SetMode(Mode),
    /// The focused application changed
    ForegroundChanged { app_id: String },
    /// Lock or display state changed
    Session(SessionState),
}

/// Events emitted by the service loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceEvent {
    /// Mode changed and was persisted
    ModeChanged { mode: Mode, previous: Mode },

    /// A press was classified
    PressClassified {
        key: VolumeKey,
        kind: PressKind,
        /// How long the key was held, in milliseconds
        held_ms: u64,
    },

    /// Media volume stepped after a short press
    VolumeAdjusted { key: VolumeKey },

    /// Media transport key sent after a long press
    MediaCommandSent { command: MediaCommand },

    /// A key event was handed through unchanged
    PassedThrough { key: VolumeKey },

    /// Foreground app report processed
    ForegroundChanged { app_id: String, camera_active: bool },

    /// Lock or display state changed
    SessionChanged { locked: bool, interactive: bool },
}

impl std::fmt::Display for ServiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceEvent::ModeChanged { mode, previous } => {
                write!(f, "MODE_CHANGED ({} -> {})", previous, mode)
            }
            ServiceEvent::PressClassified { key, kind, held_ms } => {
                write!(f, "PRESS {} {:?} ({}ms)", key, kind, held_ms)
            }
            ServiceEvent::VolumeAdjusted { key } => write!(f, "VOLUME_ADJUSTED ({})", key),
            ServiceEvent::MediaCommandSent { command } => {
                write!(f, "MEDIA_COMMAND ({})", command)
            }
            ServiceEvent::PassedThrough { key } => write!(f, "PASSED_THROUGH ({})", key),
            ServiceEvent::ForegroundChanged {
                app_id,
                camera_active,
            } => write!(f, "FOREGROUND {} (camera: {})", app_id, camera_active),
            ServiceEvent::SessionChanged {
                locked,
                interactive,
            } => write!(
                f,
                "SESSION (locked: {}, interactive: {})",
                locked, interactive
            ),
        }
    }
}
