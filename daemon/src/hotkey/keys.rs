//! Volume key definitions and raw event decoding
//!
//! Maps evdev key codes onto the two hardware buttons the daemon cares
//! about and decodes `EV_KEY` values into press/release actions.

use std::time::Instant;

use evdev::Key;
use serde::{Deserialize, Serialize};

/// evdev key event values
pub mod values {
    /// Key released
    pub const RELEASE: i32 = 0;
    /// Key pressed
    pub const PRESS: i32 = 1;
    /// Autorepeat while held
    pub const REPEAT: i32 = 2;
}

/// Hardware volume buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKey {
    Up,
    Down,
}

impl VolumeKey {
    /// Map an evdev key to a volume button
    pub fn from_key(key: Key) -> Option<Self> {
        if key == Key::KEY_VOLUMEUP {
            Some(VolumeKey::Up)
        } else if key == Key::KEY_VOLUMEDOWN {
            Some(VolumeKey::Down)
        } else {
            None
        }
    }

    /// The evdev key this button produces
    pub fn key(&self) -> Key {
        match self {
            VolumeKey::Up => Key::KEY_VOLUMEUP,
            VolumeKey::Down => Key::KEY_VOLUMEDOWN,
        }
    }
}

impl std::fmt::Display for VolumeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeKey::Up => write!(f, "VOLUME_UP"),
            VolumeKey::Down => write!(f, "VOLUME_DOWN"),
        }
    }
}

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
    Repeat,
}

impl KeyAction {
    /// Decode an `EV_KEY` value
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            values::PRESS => Some(KeyAction::Down),
            values::RELEASE => Some(KeyAction::Up),
            values::REPEAT => Some(KeyAction::Repeat),
            _ => None,
        }
    }

    /// Encode back into an `EV_KEY` value
    pub fn value(&self) -> i32 {
        match self {
            KeyAction::Down => values::PRESS,
            KeyAction::Up => values::RELEASE,
            KeyAction::Repeat => values::REPEAT,
        }
    }
}

/// A single volume key transition with its arrival time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: VolumeKey,
    pub action: KeyAction,
    pub at: Instant,
}

impl KeyEvent {
    pub fn new(key: VolumeKey, action: KeyAction, at: Instant) -> Self {
        Self { key, action, at }
    }

    /// Decode a raw evdev key transition, ignoring non-volume keys
    pub fn from_raw(key: Key, value: i32, at: Instant) -> Option<Self> {
        Some(Self {
            key: VolumeKey::from_key(key)?,
            action: KeyAction::from_value(value)?,
            at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_key_mapping() {
        assert_eq!(VolumeKey::from_key(Key::KEY_VOLUMEUP), Some(VolumeKey::Up));
        assert_eq!(VolumeKey::from_key(Key::KEY_VOLUMEDOWN), Some(VolumeKey::Down));
        assert_eq!(VolumeKey::from_key(Key::KEY_MUTE), None);
        assert_eq!(VolumeKey::Up.key(), Key::KEY_VOLUMEUP);
    }

    #[test]
    fn test_action_values() {
        assert_eq!(KeyAction::from_value(1), Some(KeyAction::Down));
        assert_eq!(KeyAction::from_value(0), Some(KeyAction::Up));
        assert_eq!(KeyAction::from_value(2), Some(KeyAction::Repeat));
        assert_eq!(KeyAction::from_value(7), None);
        assert_eq!(KeyAction::Up.value(), 0);
    }

    #[test]
    fn test_from_raw_filters_other_keys() {
        let now = Instant::now();
        assert!(KeyEvent::from_raw(Key::KEY_A, 1, now).is_none());

        let event = KeyEvent::from_raw(Key::KEY_VOLUMEDOWN, 0, now).unwrap();
        assert_eq!(event.key, VolumeKey::Down);
        assert_eq!(event.action, KeyAction::Up);
    }
}
