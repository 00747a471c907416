pub mod announce;
pub mod db;
pub mod detection;
pub mod distance;
pub mod metrics;
pub mod models;
mod runtime;
pub mod settings;
pub mod status;
pub mod telemetry;
mod utils;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

use std::{
    env,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use log::{info, warn};

use announce::LogSpeaker;
use db::Database;
use settings::{resolve_path, SettingsStore};
use voice::StdinRecognizer;

pub use runtime::{Collaborators, Runtime};

const DATA_DIR_ENV: &str = "ASSISTWEAR_DATA_DIR";
const DEBUG_ENV: &str = "ASSISTWEAR_DEBUG";
const DEFAULT_DATA_DIR: &str = "./assistwear-data";

/// Blocking tasks (stdin reads) cannot be interrupted; don't wait on them forever.
const BLOCKING_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn heartbeat_interval() -> Duration {
    if debug_enabled() {
        Duration::from_secs(10)
    } else {
        Duration::from_secs(60)
    }
}

async fn serve(runtime: Runtime) -> Result<()> {
    let mut heartbeat = tokio::time::interval(heartbeat_interval());
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!("Failed to listen for Ctrl-C: {err}");
                }
                info!("Shutdown requested");
                break;
            }
            _ = heartbeat.tick() => {
                let snapshot = runtime.metrics().get_snapshot().await;
                let status = runtime.status().current();
                info!(
                    "Heartbeat: voice={:?} telemetry={:?} cpu={:.1}% mem={:.1}MB counts={:?}",
                    status.voice,
                    status.telemetry,
                    snapshot.system.cpu_percent,
                    snapshot.system.memory_mb,
                    snapshot.counts
                );
            }
        }
    }

    runtime.shutdown().await
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("AssistWear starting up...");

    let data_dir = env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    info!("Settings loaded from {}", settings_store.path().display());

    let mut settings = settings_store.snapshot();
    settings.storage.database_path = resolve_path(&data_dir, &settings.storage.database_path);
    settings.telemetry.log_path = resolve_path(&data_dir, &settings.telemetry.log_path);

    let database = Database::new(settings.storage.database_path.clone())?;

    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("assistwear-worker")
        .build()
        .context("failed to build tokio runtime")?;

    let result = tokio_runtime.block_on(async move {
        let collaborators = Collaborators {
            speech: Box::new(LogSpeaker),
            recognizer: Some(Arc::new(StdinRecognizer)),
            command_handler: None,
        };
        let runtime = Runtime::start(settings, database, collaborators).await?;
        serve(runtime).await
    });

    tokio_runtime.shutdown_timeout(BLOCKING_SHUTDOWN_GRACE);
    result
}
