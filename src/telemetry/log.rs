use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    sync::mpsc,
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::metrics::{Counter, MetricsCollector};
use crate::models::TelemetryRecord;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const HEADER: [&str; 7] = ["Roll", "Temp", "Posture", "Distance", "Button", "Received At", "Raw"];

/// Append-only trace of every accepted telemetry record.
pub trait TelemetrySink: Send + 'static {
    fn append(&mut self, record: &TelemetryRecord, received_at: DateTime<Utc>) -> Result<()>;
}

/// CSV file sink. Each row is flushed before `append` returns.
pub struct CsvSensorLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSensorLog {
    /// Opens `path` for appending, writing the header only when the file is new or empty.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create sensor log directory {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open sensor log {}", path.display()))?;
        let is_empty = file
            .metadata()
            .with_context(|| format!("failed to stat sensor log {}", path.display()))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer
                .write_record(HEADER)
                .context("failed to write sensor log header")?;
            writer.flush().context("failed to flush sensor log header")?;
        }

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for CsvSensorLog {
    fn append(&mut self, record: &TelemetryRecord, received_at: DateTime<Utc>) -> Result<()> {
        let button = if record.button { "Yes" } else { "No" };
        let received_at = received_at.to_rfc3339();

        self.writer
            .write_record([
                record.roll.as_str(),
                record.temperature.as_str(),
                record.posture.as_str(),
                record.distance.as_deref().unwrap_or(""),
                button,
                received_at.as_str(),
                record.raw.as_str(),
            ])
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}

enum LogCommand {
    Append(TelemetryRecord, DateTime<Utc>),
    Shutdown,
}

/// Feeds a `TelemetrySink` from its own thread so file writes never block the
/// async workers. Rows are written in the order they were appended; dropping
/// the writer flushes everything queued before it returns.
pub struct SensorLogWriter {
    sender: mpsc::Sender<LogCommand>,
    worker: Option<JoinHandle<()>>,
    metrics: MetricsCollector,
}

impl SensorLogWriter {
    pub fn spawn(mut sink: Box<dyn TelemetrySink>, metrics: MetricsCollector) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<LogCommand>();
        let thread_metrics = metrics.clone();

        let worker = thread::Builder::new()
            .name("sensor-log".into())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        LogCommand::Append(record, received_at) => {
                            if let Err(err) = sink.append(&record, received_at) {
                                thread_metrics.incr(Counter::TelemetryLogFailures);
                                log_error!("Failed to write telemetry record: {err:?}");
                            }
                        }
                        LogCommand::Shutdown => break,
                    }
                }
                log_info!("Sensor log thread shutting down");
            })
            .context("failed to spawn sensor log thread")?;

        Ok(Self {
            sender,
            worker: Some(worker),
            metrics,
        })
    }

    /// Queue one record for the sensor log. Never blocks on the file.
    pub fn append(&self, record: TelemetryRecord, received_at: DateTime<Utc>) {
        if self
            .sender
            .send(LogCommand::Append(record, received_at))
            .is_err()
        {
            self.metrics.incr(Counter::TelemetryLogFailures);
            log_error!("Sensor log thread is gone, telemetry record not written");
        }
    }
}

impl Drop for SensorLogWriter {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            if self.sender.send(LogCommand::Shutdown).is_err() {
                log_error!("Sensor log thread exited before shutdown");
            }
            if let Err(join_err) = handle.join() {
                log_error!("Failed to join sensor log thread: {join_err:?}");
            }
        }
    }
}
