//! Key handling core
//!
//! - machine: short/long press classifier (Idle, Pressed)
//! - guard: mode and device-context gating for interception

mod guard;
mod machine;

pub use guard::{decide, Decision, PassReason};
pub use machine::{KeyClassifier, Press, PressKind, State, LONG_PRESS_THRESHOLD};
