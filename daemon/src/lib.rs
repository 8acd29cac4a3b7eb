//! volkeyd: hardware volume buttons as media controls
//!
//! Short presses step the media volume, long presses skip tracks. A
//! persisted mode decides when the buttons are taken over, and camera
//! apps in the foreground always get the raw keys.
//!
//! - `hotkey`: evdev capture of volume keys
//! - `state`: press classifier and dispatch guard
//! - `output`: uinput volume, media and pass-through keys
//! - `service`: the single-task loop tying it together
//! - `ipc`: control socket used by `volkeyctl`

pub mod config;
pub mod context;
pub mod events;
pub mod hotkey;
pub mod ipc;
pub mod lifecycle;
pub mod mode;
pub mod output;
pub mod service;
pub mod state;
