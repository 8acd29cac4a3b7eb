//! Dispatch guard deciding whether a key event is taken over

use crate::context::DeviceContext;
use crate::mode::Mode;

/// Why an event was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    ModeOff,
    CameraForeground,
    /// Active mode while the session is locked
    Locked,
    /// Background mode while unlocked or with the display on
    InUse,
}

/// Verdict for a single key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Intercept,
    PassThrough(PassReason),
}

impl Decision {
    pub fn intercepts(&self) -> bool {
        matches!(self, Decision::Intercept)
    }
}

/// Decide whether the current key event should be intercepted
pub fn decide(mode: Mode, ctx: &DeviceContext) -> Decision {
    match mode {
        Mode::Off => Decision::PassThrough(PassReason::ModeOff),
        // Camera apps use the volume keys as a shutter
        _ if ctx.camera_active => Decision::PassThrough(PassReason::CameraForeground),
        Mode::Active if ctx.locked => Decision::PassThrough(PassReason::Locked),
        Mode::Active => Decision::Intercept,
        Mode::Background if ctx.locked && !ctx.interactive => Decision::Intercept,
        Mode::Background => Decision::PassThrough(PassReason::InUse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [Mode; 3] = [Mode::Off, Mode::Active, Mode::Background];

    fn all_contexts() -> Vec<DeviceContext> {
        let mut out = Vec::new();
        for locked in [false, true] {
            for interactive in [false, true] {
                for camera_active in [false, true] {
                    out.push(DeviceContext {
                        locked,
                        interactive,
                        camera_active,
                    });
                }
            }
        }
        out
    }

    #[test]
    fn test_off_never_intercepts() {
        for ctx in all_contexts() {
            assert_eq!(
                decide(Mode::Off, &ctx),
                Decision::PassThrough(PassReason::ModeOff)
            );
        }
    }

    #[test]
    fn test_active_follows_lock_state() {
        for ctx in all_contexts().into_iter().filter(|c| !c.camera_active) {
            assert_eq!(decide(Mode::Active, &ctx).intercepts(), !ctx.locked, "{ctx:?}");
        }
    }

    #[test]
    fn test_background_needs_locked_and_dark() {
        for ctx in all_contexts().into_iter().filter(|c| !c.camera_active) {
            let expected = ctx.locked && !ctx.interactive;
            assert_eq!(decide(Mode::Background, &ctx).intercepts(), expected, "{ctx:?}");
        }
    }

    #[test]
    fn test_camera_suppresses_every_mode() {
        for mode in MODES {
            for ctx in all_contexts().into_iter().filter(|c| c.camera_active) {
                assert!(!decide(mode, &ctx).intercepts(), "{mode} {ctx:?}");
            }
        }
    }

    #[test]
    fn test_off_wins_over_camera() {
        let camera = DeviceContext {
            locked: false,
            interactive: true,
            camera_active: true,
        };
        assert_eq!(
            decide(Mode::Off, &camera),
            Decision::PassThrough(PassReason::ModeOff)
        );
        assert_eq!(
            decide(Mode::Active, &camera),
            Decision::PassThrough(PassReason::CameraForeground)
        );
    }

    #[test]
    fn test_pass_reasons() {
        let locked = DeviceContext {
            locked: true,
            interactive: true,
            camera_active: false,
        };
        assert_eq!(
            decide(Mode::Active, &locked),
            Decision::PassThrough(PassReason::Locked)
        );
        assert_eq!(
            decide(Mode::Background, &locked),
            Decision::PassThrough(PassReason::InUse)
        );
    }
}
