//! Standalone plugin host.
//!
//! Stands in for the game's modding runtime: loads the plugin once, feeds
//! config file notifications to it on a single task, and unloads it exactly
//! once when asked to stop.
//!
//! ```text
//!  notify thread ──▶ queue ──▶ reload task ──▶ ConfigReloadCoordinator
//!                                   ▲
//!  SIGINT/SIGTERM ──▶ Shutdown ─────┘──▶ PluginContext::on_destroy
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use piece_manager_mod::lifecycle::{signals, Shutdown};
use piece_manager_mod::observability::logging;
use piece_manager_mod::sync::SyncRole;
use piece_manager_mod::{PluginContext, PluginOptions};

#[derive(Parser)]
#[command(name = "piece-mod-host")]
#[command(about = "Run the piece manager mod outside the game", long_about = None)]
struct Args {
    /// Directory holding plugin config files.
    #[arg(short, long, default_value = "BepInEx/config")]
    config_dir: PathBuf,

    /// Minimum milliseconds between two config reloads.
    #[arg(long, default_value_t = 1000)]
    debounce_ms: u64,

    /// Act as a client instead of the server.
    #[arg(long)]
    client: bool,

    /// Log level for this crate (RUST_LOG takes precedence).
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(args.log_level.as_deref());

    tracing::info!("piece-mod-host v{} starting", env!("CARGO_PKG_VERSION"));

    // The game creates its config directory before loading plugins.
    std::fs::create_dir_all(&args.config_dir)?;

    let mut options = PluginOptions::new(&args.config_dir);
    options.debounce = Duration::from_millis(args.debounce_ms);
    options.role = if args.client {
        SyncRole::Client
    } else {
        SyncRole::Server
    };

    let mut plugin = PluginContext::awake(options)?;
    let shutdown = Shutdown::new();

    let reload_task = plugin.take_notifications().map(|queue| {
        let coordinator = plugin.coordinator().clone();
        tokio::spawn(coordinator.run(queue, shutdown.subscribe()))
    });

    tracing::info!(
        locked = plugin.sync().is_locked(),
        path = %plugin.config().location().full_path().display(),
        "Watching configuration, press Ctrl-C to stop"
    );

    signals::wait_for_stop_signal().await?;
    tracing::info!("Stop signal received");
    shutdown.trigger();

    if let Some(task) = reload_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Reload task ended abnormally");
        }
    }
    plugin.on_destroy();

    tracing::info!("Shutdown complete");
    Ok(())
}
