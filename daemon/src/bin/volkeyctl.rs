//! volkeyctl: command-line control for volkeyd

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use volkeyd::config::Config;
use volkeyd::ipc::{Client, DaemonStatus, Request, Response};
use volkeyd::mode::Mode;

#[derive(Debug, Parser)]
#[command(name = "volkeyctl", version, about = "Control the volkeyd daemon")]
struct Cli {
    /// Control socket (defaults to the daemon's data directory)
    #[arg(long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show mode, session state and uptime
    Status,
    /// Check that the daemon answers
    Ping,
    /// Select the remapping mode: off, active or background
    Mode { mode: Mode },
    /// Report the focused application id
    Foreground { app_id: String },
    /// Report lock and display state
    DeviceState {
        #[arg(long)]
        locked: bool,
        #[arg(long)]
        interactive: bool,
    },
    /// Print service events as they happen
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let socket = match cli.socket {
        Some(path) => path,
        None => Config::load()?.socket_path,
    };

    let mut client = Client::connect(&socket)
        .await
        .with_context(|| format!("cannot connect to {socket:?} - is volkeyd running?"))?;

    let request = match &cli.command {
        Command::Status => Request::GetStatus,
        Command::Ping => Request::Ping,
        Command::Mode { mode } => Request::SetMode { mode: *mode },
        Command::Foreground { app_id } => Request::ForegroundChanged {
            app_id: app_id.clone(),
        },
        Command::DeviceState {
            locked,
            interactive,
        } => Request::DeviceState {
            locked: *locked,
            interactive: *interactive,
        },
        Command::Watch => Request::Subscribe,
    };

    let response = client.request(&request).await?;
    match response {
        Response::Pong => println!("pong"),
        Response::Status(status) => print_status(&status),
        Response::ModeSet { mode } => println!("mode set to {mode}"),
        Response::Ack => println!("ok"),
        Response::Subscribed => loop {
            match client.next().await? {
                Response::Event { event } => println!("{event}"),
                other => bail!("unexpected message: {other:?}"),
            }
        },
        Response::Event { event } => println!("{event}"),
        Response::Error { code, message } => bail!("{code}: {message}"),
    }

    Ok(())
}

fn print_status(status: &DaemonStatus) {
    println!("version:      {}", status.version);
    println!("mode:         {}", status.mode);
    println!("locked:       {}", status.context.locked);
    println!("interactive:  {}", status.context.interactive);
    println!("camera:       {}", status.context.camera_active);
    println!("devices:      {}", status.devices);
    println!("uptime:       {}s", status.uptime_secs);
}
