//! Remapping mode and its persistence
//!
//! The mode decides when volume buttons are taken over:
//! - Off: never, keys behave normally
//! - Active: while the session is unlocked
//! - Background: only while locked with the display off

mod store;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use store::{ModeStore, StoreError, MODE_KEY};

/// User-selected remapping mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No interception
    #[default]
    Off,
    /// Intercept while unlocked
    Active,
    /// Intercept while locked and non-interactive
    Background,
}

impl Mode {
    /// Name used in the preferences file
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Off => "OFF",
            Mode::Active => "ACTIVE",
            Mode::Background => "BACKGROUND",
        }
    }

    /// Exact match on a name written by [`Mode::as_str`]
    pub fn from_stored(name: &str) -> Option<Self> {
        [Mode::Off, Mode::Active, Mode::Background]
            .into_iter()
            .find(|mode| mode.as_str() == name)
    }

    /// Parse a stored mode name, falling back to `Off` for anything that is
    /// not exactly one of the stored names
    pub fn parse_or_off(name: &str) -> Self {
        Self::from_stored(name).unwrap_or(Mode::Off)
    }

    /// Whether key events can be intercepted at all in this mode
    pub fn is_enabled(&self) -> bool {
        *self != Mode::Off
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(Mode::Off),
            "ACTIVE" => Ok(Mode::Active),
            "BACKGROUND" => Ok(Mode::Background),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
