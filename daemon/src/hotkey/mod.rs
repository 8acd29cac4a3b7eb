//! Hotkey module for hardware volume button capture
//!
//! Uses Linux evdev to grab devices that carry volume keys and report
//! press/release transitions to the service loop.

mod keys;
mod listener;

pub use keys::{KeyAction, KeyEvent, VolumeKey};
pub use listener::{discover_devices, HotkeyError, HotkeyEvent, HotkeyListener, InputDevice};
