//! Volume key listener using Linux evdev
//!
//! Finds every key-only input device that exposes a volume key, grabs it
//! exclusively and reads it on its own tokio task. Volume key transitions
//! are decoded into `KeyEvent`s; every other key on a grabbed device is
//! handed back unchanged so it can be re-emitted on the virtual device.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use evdev::{AttributeSet, AttributeSetRef, Device, EventType, InputEvent, InputEventKind, Key};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::keys::{KeyEvent, VolumeKey};

const INPUT_DIR: &str = "/dev/input";

/// Events sent from the listener to the service loop
#[derive(Debug, Clone)]
pub enum HotkeyEvent {
    /// A volume key transition
    Key(KeyEvent),
    /// Non-volume key events from a grabbed device, one SYN frame worth
    Forward(Vec<InputEvent>),
    /// A device stopped producing events (unplugged or read error)
    DeviceLost(PathBuf),
}

/// An opened input device that carries at least one volume key
pub struct InputDevice {
    pub path: PathBuf,
    pub name: String,
    device: Device,
}

impl InputDevice {
    /// All keys this device can produce
    pub fn supported_keys(&self) -> AttributeSet<Key> {
        let mut keys = AttributeSet::<Key>::new();
        if let Some(supported) = self.device.supported_keys() {
            for key in supported.iter() {
                keys.insert(key);
            }
        }
        keys
    }
}

impl std::fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDevice")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("cannot read /dev/input: {0} - is the user in the 'input' group?")]
    InputDir(#[source] std::io::Error),

    #[error("no input device with volume keys found")]
    NoDevices,

    #[error("failed to grab {path:?}: {source}")]
    Grab {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open event stream for {path:?}: {source}")]
    Stream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scan `/dev/input` for devices that expose volume keys
///
/// Devices named `skip_name` (our own virtual output) are ignored so that
/// re-emitted keys are never read back.
pub fn discover_devices(skip_name: &str) -> Result<Vec<InputDevice>, HotkeyError> {
    discover_in(Path::new(INPUT_DIR), skip_name)
}

fn discover_in(dir: &Path, skip_name: &str) -> Result<Vec<InputDevice>, HotkeyError> {
    let entries = std::fs::read_dir(dir).map_err(HotkeyError::InputDir)?;
    let mut devices = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);
        if !is_event_node {
            continue;
        }

        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                debug!(?path, error = %e, "cannot open input device");
                continue;
            }
        };

        let name = device.name().unwrap_or("unknown").to_string();
        if name == skip_name {
            continue;
        }

        let has_volume_keys = device.supported_events().contains(EventType::KEY)
            && device
                .supported_keys()
                .map(|keys| {
                    keys.contains(Key::KEY_VOLUMEUP) || keys.contains(Key::KEY_VOLUMEDOWN)
                })
                .unwrap_or(false);

        if !has_volume_keys {
            continue;
        }
        // Only keys are re-emitted, so grabbing a node that also carries
        // pointer, axis or switch events would swallow them
        if !is_key_only(device.supported_events()) {
            warn!(?path, %name, "skipping volume key device with non-key events");
            continue;
        }

        info!(?path, %name, "found device with volume keys");
        devices.push(InputDevice { path, name, device });
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Event types whose traffic would be lost once the device is grabbed
const UNFORWARDED_EVENTS: [EventType; 3] = [
    EventType::RELATIVE,
    EventType::ABSOLUTE,
    EventType::SWITCH,
];

/// Whether a device can be grabbed without losing non-key input
fn is_key_only(events: &AttributeSetRef<EventType>) -> bool {
    events.contains(EventType::KEY)
        && !UNFORWARDED_EVENTS
            .iter()
            .any(|event_type| events.contains(*event_type))
}

/// Listener that owns the grabbed devices and their reader tasks
pub struct HotkeyListener {
    event_tx: mpsc::Sender<HotkeyEvent>,
    running: Arc<AtomicBool>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(event_tx: mpsc::Sender<HotkeyEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            readers: Mutex::new(Vec::new()),
        }
    }

    /// Grab the devices and spawn one reader task per device
    ///
    /// Must be called from within a tokio runtime. Devices that fail to
    /// grab are skipped; it is an error only if none could be started.
    pub fn start(&self, devices: Vec<InputDevice>) -> Result<(), HotkeyError> {
        if devices.is_empty() {
            return Err(HotkeyError::NoDevices);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let mut handles = Vec::new();
        for input in devices {
            let path = input.path.clone();
            match open_stream(input) {
                Ok(stream) => {
                    let tx = self.event_tx.clone();
                    let running = Arc::clone(&self.running);
                    handles.push(tokio::spawn(read_device(path, stream, tx, running)));
                }
                Err(e) => {
                    error!(error = %e, "skipping input device");
                }
            }
        }

        if handles.is_empty() {
            self.running.store(false, Ordering::SeqCst);
            return Err(HotkeyError::NoDevices);
        }

        info!(devices = handles.len(), "hotkey listener started");
        if let Ok(mut readers) = self.readers.lock() {
            readers.extend(handles);
        }
        Ok(())
    }

    /// Stop all readers, releasing the device grabs
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut readers) = self.readers.lock() {
            for handle in readers.drain(..) {
                handle.abort();
            }
        }
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn open_stream(input: InputDevice) -> Result<evdev::EventStream, HotkeyError> {
    let InputDevice {
        path, mut device, ..
    } = input;

    device.grab().map_err(|source| HotkeyError::Grab {
        path: path.clone(),
        source,
    })?;

    device
        .into_event_stream()
        .map_err(|source| HotkeyError::Stream { path, source })
}

async fn read_device(
    path: PathBuf,
    mut stream: evdev::EventStream,
    tx: mpsc::Sender<HotkeyEvent>,
    running: Arc<AtomicBool>,
) {
    debug!(?path, "device reader started");
    let mut pending: Vec<InputEvent> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let event = match stream.next_event().await {
            Ok(event) => event,
            Err(e) => {
                warn!(?path, error = %e, "input device read failed");
                let _ = tx.send(HotkeyEvent::DeviceLost(path.clone())).await;
                break;
            }
        };

        let outgoing = match event.kind() {
            InputEventKind::Key(key) => match KeyEvent::from_raw(key, event.value(), Instant::now()) {
                Some(key_event) => Some(HotkeyEvent::Key(key_event)),
                None if VolumeKey::from_key(key).is_some() => None,
                None => {
                    pending.push(event);
                    None
                }
            },
            InputEventKind::Synchronization(_) if !pending.is_empty() => {
                Some(HotkeyEvent::Forward(std::mem::take(&mut pending)))
            }
            _ => None,
        };

        if let Some(outgoing) = outgoing {
            if tx.send(outgoing).await.is_err() {
                debug!(?path, "hotkey channel closed");
                break;
            }
        }
    }

    debug!(?path, "device reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        assert!(!listener.is_running());
    }

    #[test]
    fn test_start_without_devices_fails() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        assert!(matches!(listener.start(Vec::new()), Err(HotkeyError::NoDevices)));
        assert!(!listener.is_running());
    }

    #[test]
    fn test_discover_skips_non_event_nodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mice"), b"").unwrap();
        std::fs::write(dir.path().join("event0"), b"").unwrap();

        // Regular files are not input devices and fail to open
        let devices = discover_in(dir.path(), "volkeyd").unwrap();
        assert!(devices.is_empty());
    }

    fn event_set(types: &[EventType]) -> AttributeSet<EventType> {
        let mut set = AttributeSet::<EventType>::new();
        for event_type in types {
            set.insert(*event_type);
        }
        set
    }

    #[test]
    fn test_key_only_devices_are_grabbable() {
        let keyboard = event_set(&[
            EventType::SYNCHRONIZATION,
            EventType::KEY,
            EventType::MISC,
            EventType::LED,
        ]);
        assert!(is_key_only(&keyboard));
    }

    #[test]
    fn test_mixed_devices_are_not_grabbed() {
        let combo = event_set(&[EventType::SYNCHRONIZATION, EventType::KEY, EventType::RELATIVE]);
        assert!(!is_key_only(&combo));

        let touch = event_set(&[EventType::KEY, EventType::ABSOLUTE]);
        assert!(!is_key_only(&touch));

        let gpio_keys = event_set(&[EventType::KEY, EventType::SWITCH]);
        assert!(!is_key_only(&gpio_keys));

        let no_keys = event_set(&[EventType::SYNCHRONIZATION]);
        assert!(!is_key_only(&no_keys));
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_in(&missing, "volkeyd"),
            Err(HotkeyError::InputDir(_))
        ));
    }
}
