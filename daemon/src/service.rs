//! Service loop that owns mode, classifier and device context
//!
//! Key events and control messages are processed one at a time on a
//! single task, so no state here is shared or locked.

use evdev::InputEvent;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::context::{CameraApps, DeviceContext, SessionState};
use crate::events::{ControlMessage, ServiceEvent};
use crate::hotkey::{HotkeyEvent, KeyAction, KeyEvent};
use crate::mode::{Mode, ModeStore};
use crate::output::{MediaCommand, MediaOutput, VolumeStep};
use crate::state::{decide, Decision, KeyClassifier, Press, PressKind};

/// The volume button service
pub struct Service<O: MediaOutput> {
    mode: Mode,
    store: ModeStore,
    classifier: KeyClassifier,
    context: DeviceContext,
    cameras: CameraApps,
    output: O,
    event_tx: broadcast::Sender<ServiceEvent>,
}

impl<O: MediaOutput> Service<O> {
    /// Create the service with the mode loaded from `store`
    pub fn new(
        store: ModeStore,
        cameras: CameraApps,
        output: O,
        event_tx: broadcast::Sender<ServiceEvent>,
    ) -> Self {
        let mode = store.load();
        let mut service = Self {
            mode,
            store,
            classifier: KeyClassifier::new(),
            context: DeviceContext::default(),
            cameras,
            output,
            event_tx,
        };
        info!(%mode, "service created");
        service.set_mode(mode);
        service
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn context(&self) -> DeviceContext {
        self.context
    }

    /// Run until both input channels close
    pub async fn run(
        &mut self,
        mut hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        mut control_rx: mpsc::Receiver<ControlMessage>,
    ) {
        info!(mode = %self.mode, "service loop started");
        let mut hotkeys_open = true;
        let mut control_open = true;

        while hotkeys_open || control_open {
            tokio::select! {
                event = hotkey_rx.recv(), if hotkeys_open => match event {
                    Some(event) => self.handle_hotkey(event),
                    None => {
                        warn!("hotkey channel closed, volume keys no longer handled");
                        hotkeys_open = false;
                    }
                },
                message = control_rx.recv(), if control_open => match message {
                    Some(message) => self.handle_control(message),
                    None => {
                        debug!("control channel closed");
                        control_open = false;
                    }
                },
            }
        }

        info!("service loop stopped");
    }

    /// Handle one event from the listener
    pub fn handle_hotkey(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::Key(key_event) => {
                self.handle_key(key_event);
            }
            HotkeyEvent::Forward(events) => self.forward(&events),
            HotkeyEvent::DeviceLost(path) => {
                warn!(?path, "input device lost");
                self.classifier.reset();
            }
        }
    }

    /// Handle a volume key transition, returning the guard's verdict
    pub fn handle_key(&mut self, event: KeyEvent) -> Decision {
        let decision = decide(self.mode, &self.context);

        if let Decision::PassThrough(reason) = decision {
            debug!(key = %event.key, action = ?event.action, ?reason, "passing key through");
            if event.action == KeyAction::Up {
                // A press whose key-down was intercepted is dropped: no
                // media action fires and only the release reaches the desktop
                self.classifier.reset();
            }
            self.pass_through(event);
            return decision;
        }

        match event.action {
            KeyAction::Down => self.classifier.key_down(event.key, event.at),
            KeyAction::Repeat => {}
            KeyAction::Up => match self.classifier.key_up(event.key, event.at) {
                Some(press) => self.execute(press),
                // The matching key-down went to the desktop, so must the release
                None => self.pass_through(event),
            },
        }

        decision
    }

    /// Handle a control message
    pub fn handle_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetMode(mode) => self.set_mode(mode),
            ControlMessage::ForegroundChanged { app_id } => {
                let camera_active = self.context.set_foreground(&app_id, &self.cameras);
                debug!(%app_id, camera_active, "foreground app changed");
                self.emit(ServiceEvent::ForegroundChanged {
                    app_id,
                    camera_active,
                });
            }
            ControlMessage::Session(state) => self.set_session(state),
        }
    }

    /// Switch mode and persist it
    pub fn set_mode(&mut self, mode: Mode) {
        let previous = self.mode;
        info!(from = %previous, to = %mode, "updating mode");
        self.mode = mode;

        if let Err(e) = self.store.save(mode) {
            warn!(error = %e, "failed to persist mode");
        }

        if mode.is_enabled() {
            info!("volume key handling enabled in {} mode", mode);
        } else {
            info!("volume key handling disabled (mode OFF)");
        }

        self.emit(ServiceEvent::ModeChanged { mode, previous });
    }

    fn set_session(&mut self, state: SessionState) {
        if self.context.set_session(state) {
            info!(
                locked = state.locked,
                interactive = state.interactive,
                "session state changed"
            );
            self.emit(ServiceEvent::SessionChanged {
                locked: state.locked,
                interactive: state.interactive,
            });
        }
    }

    fn execute(&mut self, press: Press) {
        self.emit(ServiceEvent::PressClassified {
            key: press.key,
            kind: press.kind,
            held_ms: press.held.as_millis() as u64,
        });

        match press.kind {
            PressKind::Short => match self.output.adjust_volume(VolumeStep::for_key(press.key)) {
                Ok(()) => self.emit(ServiceEvent::VolumeAdjusted { key: press.key }),
                Err(e) => error!(error = %e, key = %press.key, "failed to adjust volume"),
            },
            PressKind::Long => {
                let command = MediaCommand::for_key(press.key);
                match self.output.media_command(command) {
                    Ok(()) => self.emit(ServiceEvent::MediaCommandSent { command }),
                    Err(e) => error!(error = %e, %command, "failed to send media command"),
                }
            }
        }
    }

    fn pass_through(&mut self, event: KeyEvent) {
        match self.output.pass_through(event.key, event.action) {
            Ok(()) => {
                if event.action != KeyAction::Repeat {
                    self.emit(ServiceEvent::PassedThrough { key: event.key });
                }
            }
            Err(e) => error!(error = %e, key = %event.key, "failed to pass key through"),
        }
    }

    fn forward(&mut self, events: &[InputEvent]) {
        if let Err(e) = self.output.forward(events) {
            error!(error = %e, "failed to forward key events");
        }
    }

    fn emit(&self, event: ServiceEvent) {
        debug!(%event, "emitting service event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
