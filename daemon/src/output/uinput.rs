//! uinput virtual device used for all synthesized key events

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::{debug, info};

use super::{MediaCommand, MediaOutput, OutputError, VolumeDirection, VolumeStep};
use crate::hotkey::{KeyAction, VolumeKey};

/// Name of the virtual device, also used to skip it during discovery
pub const VIRTUAL_DEVICE_NAME: &str = "volkeyd virtual keypad";

/// Virtual keypad that can emit volume, media and forwarded keys
pub struct VirtualKeypad {
    device: VirtualDevice,
}

impl VirtualKeypad {
    /// Create the device
    ///
    /// `forwarded` holds the keys of every grabbed device so that their
    /// other keys keep working once re-emitted here.
    pub fn new(forwarded: &AttributeSet<Key>) -> Result<Self, OutputError> {
        let mut keys = AttributeSet::<Key>::new();
        for key in forwarded.iter() {
            keys.insert(key);
        }
        for key in [
            Key::KEY_VOLUMEUP,
            Key::KEY_VOLUMEDOWN,
            Key::KEY_NEXTSONG,
            Key::KEY_PREVIOUSSONG,
        ] {
            keys.insert(key);
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(VIRTUAL_DEVICE_NAME).with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(OutputError::Create)?;

        info!(name = VIRTUAL_DEVICE_NAME, "virtual keypad created");
        Ok(Self { device })
    }

    fn tap(&mut self, key: Key, what: &str) -> Result<(), OutputError> {
        self.emit(&[key_event(key, KeyAction::Down)], what)?;
        self.emit(&[key_event(key, KeyAction::Up)], what)
    }

    fn emit(&mut self, events: &[InputEvent], what: &str) -> Result<(), OutputError> {
        self.device.emit(events).map_err(|source| OutputError::Emit {
            what: what.to_string(),
            source,
        })
    }
}

impl MediaOutput for VirtualKeypad {
    fn adjust_volume(&mut self, step: VolumeStep) -> Result<(), OutputError> {
        // The desktop turns a volume key into a step of the default sink and
        // shows its own overlay, so `show_ui` is always honoured here
        let key = match step.direction {
            VolumeDirection::Raise => Key::KEY_VOLUMEUP,
            VolumeDirection::Lower => Key::KEY_VOLUMEDOWN,
        };
        debug!(?step, "adjusting media volume");
        self.tap(key, "volume step")
    }

    fn media_command(&mut self, command: MediaCommand) -> Result<(), OutputError> {
        debug!(%command, "sending media command");
        self.tap(command.key(), "media command")
    }

    fn pass_through(&mut self, key: VolumeKey, action: KeyAction) -> Result<(), OutputError> {
        self.emit(&[key_event(key.key(), action)], "pass-through key")
    }

    fn forward(&mut self, events: &[InputEvent]) -> Result<(), OutputError> {
        if events.is_empty() {
            return Ok(());
        }
        self.emit(events, "forwarded keys")
    }
}

fn key_event(key: Key, action: KeyAction) -> InputEvent {
    InputEvent::new(EventType::KEY, key.code(), action.value())
}
