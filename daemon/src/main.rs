//! volkeyd: background daemon that remaps hardware volume buttons
//!
//! This daemon runs as a user service and provides:
//! - Volume key capture via evdev, re-emission via uinput
//! - Short press: media volume step; long press: next/previous track
//! - Mode gating (OFF / ACTIVE / BACKGROUND) by lock and display state
//! - IPC server for mode changes and foreground-app reports

use anyhow::{Context, Result};
use evdev::{AttributeSet, Key};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use volkeyd::config::Config;
use volkeyd::context::LogindPoller;
use volkeyd::events::ServiceEvent;
use volkeyd::hotkey::{discover_devices, HotkeyListener};
use volkeyd::ipc::Server;
use volkeyd::lifecycle::{ServiceIndicator, ShutdownSignal, WakeLock};
use volkeyd::mode::ModeStore;
use volkeyd::output::{VirtualKeypad, VIRTUAL_DEVICE_NAME};
use volkeyd::service::Service;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "volkeyd starting");

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.prefs_path, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Listener -> service
    let (hotkey_tx, hotkey_rx) = mpsc::channel(64);
    // IPC server, logind poller -> service
    let (control_tx, control_rx) = mpsc::channel(32);
    // Service -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<ServiceEvent>(64);

    let wake_lock = if config.wake_lock.is_zero() {
        None
    } else {
        match WakeLock::acquire(config.wake_lock).await {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!(error = %e, "failed to acquire wake lock");
                None
            }
        }
    };

    let mut indicator = if config.indicator {
        ServiceIndicator::show().await
    } else {
        ServiceIndicator::disabled()
    };

    let devices = match discover_devices(VIRTUAL_DEVICE_NAME) {
        Ok(devices) => devices,
        Err(e) => {
            error!(error = %e, "failed to scan input devices");
            Vec::new()
        }
    };

    // Grabbed devices lose all their keys, so the keypad must be able to
    // re-emit every one of them
    let mut forwarded = AttributeSet::<Key>::new();
    for device in &devices {
        for key in device.supported_keys().iter() {
            forwarded.insert(key);
        }
    }
    let keypad = VirtualKeypad::new(&forwarded)
        .context("failed to create virtual keypad - is /dev/uinput writable?")?;

    let device_count = devices.len();
    let listener = HotkeyListener::new(hotkey_tx);
    match listener.start(devices) {
        Ok(()) => {
            info!(devices = device_count, "hotkey listener started");
        }
        Err(e) => {
            error!(error = %e, "failed to start hotkey listener");
            warn!("continuing without volume key capture - check /dev/input permissions");
        }
    }

    let store = ModeStore::new(&config.prefs_path);
    let mut service = Service::new(store, config.camera_apps(), keypad, event_tx.clone());

    let server = Server::new(&config.socket_path, control_tx.clone(), event_tx.clone())?;
    let grabbed = if listener.is_running() { device_count } else { 0 };
    server.set_initial(service.mode(), grabbed).await;

    if config.logind {
        tokio::spawn(LogindPoller::new(control_tx.clone(), config.logind_interval).run());
    }
    drop(control_tx);

    let mut status_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!(mode = %service.mode(), "daemon initialized, entering main loop");

    tokio::select! {
        _ = service.run(hotkey_rx, control_rx) => {
            info!("service loop exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "IPC server error");
            }
        }

        // Keep the IPC status snapshot in sync with the service
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => server_for_events.apply_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "status receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("status updater exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    listener.stop();
    server.shutdown().await;
    indicator.close();
    if let Some(lock) = wake_lock {
        lock.release();
    }

    info!("volkeyd stopped");

    Ok(())
}
