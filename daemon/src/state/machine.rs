//! Press classifier state machine
//!
//! Tracks one press session at a time and classifies each release as a
//! short or long press by the time the key was held.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hotkey::VolumeKey;

/// Hold time at or above which a press counts as long
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(500);

/// Classifier states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// No key held
    #[default]
    Idle,
    /// A volume key went down at `since`
    Pressed { key: VolumeKey, since: Instant },
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Pressed { key, .. } => write!(f, "Pressed({})", key),
        }
    }
}

/// Outcome of a completed press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressKind {
    Short,
    Long,
}

impl PressKind {
    /// Classify a hold duration
    pub fn from_held(held: Duration) -> Self {
        if held >= LONG_PRESS_THRESHOLD {
            PressKind::Long
        } else {
            PressKind::Short
        }
    }
}

/// A classified press, ready for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    /// Key the action applies to
    pub key: VolumeKey,
    pub kind: PressKind,
    pub held: Duration,
}

/// The classifier that turns key transitions into presses
#[derive(Debug, Default)]
pub struct KeyClassifier {
    state: State,
}

impl KeyClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Open a press session, replacing any session already open
    pub fn key_down(&mut self, key: VolumeKey, at: Instant) {
        if let State::Pressed { key: previous, .. } = self.state {
            debug!(%previous, %key, "press session overwritten");
        }
        self.state = State::Pressed { key, since: at };
    }

    /// Close the press session and classify it
    ///
    /// Returns `None` when no session is open. A long press acts on the
    /// key that opened the session; a short press acts on the released key.
    pub fn key_up(&mut self, key: VolumeKey, at: Instant) -> Option<Press> {
        let State::Pressed { key: pressed, since } = std::mem::take(&mut self.state) else {
            debug!(%key, "release without open session");
            return None;
        };

        let held = at.saturating_duration_since(since);
        let kind = PressKind::from_held(held);
        let key = match kind {
            PressKind::Long => pressed,
            PressKind::Short => key,
        };

        debug!(%key, ?kind, held_ms = held.as_millis() as u64, "press classified");
        Some(Press { key, kind, held })
    }

    /// Drop any open session
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_initial_state() {
        let classifier = KeyClassifier::new();
        assert_eq!(classifier.state(), State::Idle);
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(PressKind::from_held(ms(0)), PressKind::Short);
        assert_eq!(PressKind::from_held(ms(499)), PressKind::Short);
        assert_eq!(PressKind::from_held(ms(500)), PressKind::Long);
        assert_eq!(PressKind::from_held(ms(501)), PressKind::Long);
        assert_eq!(PressKind::from_held(Duration::from_secs(30)), PressKind::Long);
    }

    #[test]
    fn test_exactly_threshold_is_long() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now();

        classifier.key_down(VolumeKey::Up, t0);
        let press = classifier.key_up(VolumeKey::Up, t0 + LONG_PRESS_THRESHOLD).unwrap();
        assert_eq!(press.kind, PressKind::Long);
        assert_eq!(press.held, LONG_PRESS_THRESHOLD);
    }

    #[test]
    fn test_long_press_volume_up() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now();

        classifier.key_down(VolumeKey::Up, t0);
        assert!(matches!(classifier.state(), State::Pressed { key: VolumeKey::Up, .. }));

        let press = classifier.key_up(VolumeKey::Up, t0 + ms(600)).unwrap();
        assert_eq!(press.key, VolumeKey::Up);
        assert_eq!(press.kind, PressKind::Long);
        assert_eq!(classifier.state(), State::Idle);
    }

    #[test]
    fn test_short_press_volume_down() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now();

        classifier.key_down(VolumeKey::Down, t0);
        let press = classifier.key_up(VolumeKey::Down, t0 + ms(100)).unwrap();
        assert_eq!(press.key, VolumeKey::Down);
        assert_eq!(press.kind, PressKind::Short);
    }

    #[test]
    fn test_release_without_session() {
        let mut classifier = KeyClassifier::new();
        assert!(classifier.key_up(VolumeKey::Up, Instant::now()).is_none());
        assert_eq!(classifier.state(), State::Idle);
    }

    #[test]
    fn test_second_key_down_overwrites_session() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now();

        classifier.key_down(VolumeKey::Up, t0);
        classifier.key_down(VolumeKey::Down, t0 + ms(400));

        // Timed from the second key-down
        let press = classifier.key_up(VolumeKey::Down, t0 + ms(700)).unwrap();
        assert_eq!(press.kind, PressKind::Short);
        assert_eq!(press.held, ms(300));
    }

    #[test]
    fn test_long_press_uses_session_key() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now();

        classifier.key_down(VolumeKey::Down, t0);
        let press = classifier.key_up(VolumeKey::Up, t0 + ms(900)).unwrap();
        assert_eq!(press.key, VolumeKey::Down);

        classifier.key_down(VolumeKey::Down, t0);
        let press = classifier.key_up(VolumeKey::Up, t0 + ms(50)).unwrap();
        assert_eq!(press.key, VolumeKey::Up);
    }

    #[test]
    fn test_release_before_press_time_is_short() {
        let mut classifier = KeyClassifier::new();
        let t0 = Instant::now() + ms(1000);

        classifier.key_down(VolumeKey::Up, t0);
        let press = classifier.key_up(VolumeKey::Up, t0 - ms(10)).unwrap();
        assert_eq!(press.held, Duration::ZERO);
        assert_eq!(press.kind, PressKind::Short);
    }

    #[test]
    fn test_reset() {
        let mut classifier = KeyClassifier::new();
        classifier.key_down(VolumeKey::Up, Instant::now());
        classifier.reset();
        assert_eq!(classifier.state(), State::Idle);
    }
}
