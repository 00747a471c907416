use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::announce::AnnouncementMediator;
use crate::metrics::MetricsCollector;
use crate::models::TelemetryRecord;
use crate::status::{ComponentStatus, StatusBoard};

use super::ingest::{LatestTelemetry, TelemetryIngest};
use super::log::{CsvSensorLog, SensorLogWriter};
use super::loop_worker::{telemetry_loop, TelemetryError};

pub const NO_TELEMETRY: &str = "no telemetry available";

/// Where the sensor stream comes from and where accepted records go.
#[derive(Debug, Clone)]
pub struct TelemetrySource {
    pub device_path: PathBuf,
    pub log_path: PathBuf,
    pub poll_interval: Duration,
}

pub struct TelemetryController {
    status: StatusBoard,
    latest_tx: Arc<watch::Sender<Option<TelemetryRecord>>>,
    latest_rx: LatestTelemetry,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl TelemetryController {
    pub fn new(status: StatusBoard) -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        Self {
            status,
            latest_tx: Arc::new(latest_tx),
            latest_rx,
            handle: None,
            cancel_token: None,
        }
    }

    /// Most recent accepted record; `None` until the sensor has produced one.
    pub fn latest(&self) -> LatestTelemetry {
        self.latest_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Mark telemetry off without touching the device.
    pub fn disable(&self, reason: &str) {
        info!("Telemetry disabled: {reason}");
        self.status
            .report_telemetry(ComponentStatus::Disabled(reason.to_string()));
    }

    /// Open the sensor device and start ingesting.
    ///
    /// A missing device is not an error: telemetry reports `Disabled` and the
    /// rest of the runtime carries on.
    pub async fn start(
        &mut self,
        source: &TelemetrySource,
        mediator: AnnouncementMediator,
        metrics: MetricsCollector,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("telemetry already active");
        }

        let device = match tokio::fs::File::open(&source.device_path).await {
            Ok(device) => device,
            Err(err) => {
                let absent = TelemetryError::DeviceAbsent {
                    path: source.device_path.display().to_string(),
                    reason: err.to_string(),
                };
                warn!("{absent}; continuing without telemetry");
                self.disable(NO_TELEMETRY);
                return Ok(());
            }
        };
        info!("Sensor device opened at {}", source.device_path.display());

        let sensor_log = match CsvSensorLog::open(source.log_path.clone())
            .and_then(|log| SensorLogWriter::spawn(Box::new(log), metrics.clone()))
        {
            Ok(writer) => writer,
            Err(err) => {
                error!("Telemetry cannot start: {err:?}");
                self.status
                    .report_telemetry(ComponentStatus::Failed(format!("{err:#}")));
                return Ok(());
            }
        };

        let ingest = TelemetryIngest::new(
            sensor_log,
            Arc::clone(&self.latest_tx),
            mediator,
            metrics,
        );
        self.spawn(BufReader::new(device), ingest, source.poll_interval);
        Ok(())
    }

    fn spawn<R>(&mut self, reader: R, ingest: TelemetryIngest, poll_interval: Duration)
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let status = self.status.clone();

        status.report_telemetry(ComponentStatus::Running);
        let handle = tokio::spawn(async move {
            match telemetry_loop(reader, ingest, poll_interval, token_clone).await {
                Ok(()) => status.report_telemetry(ComponentStatus::Stopped),
                Err(err) => {
                    error!("Telemetry loop stopped: {err}");
                    status.report_telemetry(ComponentStatus::Failed(err.to_string()));
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("telemetry loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSpeaker;
    use tempfile::TempDir;

    fn mediator(metrics: &MetricsCollector) -> AnnouncementMediator {
        AnnouncementMediator::new(
            Box::new(RecordingSpeaker::new()),
            Duration::from_secs(3),
            32,
            None,
            metrics.clone(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_device_degrades_to_disabled() {
        let tmp_dir = TempDir::new().unwrap();
        let status = StatusBoard::new();
        let metrics = MetricsCollector::new();
        let mut controller = TelemetryController::new(status.clone());

        let source = TelemetrySource {
            device_path: tmp_dir.path().join("ttyUSB9"),
            log_path: tmp_dir.path().join("sensor_data.csv"),
            poll_interval: Duration::from_millis(10),
        };
        controller
            .start(&source, mediator(&metrics), metrics.clone())
            .await
            .unwrap();

        assert!(!controller.is_running());
        assert_eq!(
            status.current().telemetry,
            ComponentStatus::Disabled(NO_TELEMETRY.into())
        );
        assert!(controller.latest().borrow().is_none());
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn tails_device_file_into_sensor_log() {
        let tmp_dir = TempDir::new().unwrap();
        let device_path = tmp_dir.path().join("sensor.tty");
        std::fs::write(
            &device_path,
            "Mode: Data Enabled\n\
             Roll: 4°, Temp: 35.9°C, , Posture: Good, Distance: 80cm, Button: No\n",
        )
        .unwrap();

        let status = StatusBoard::new();
        let metrics = MetricsCollector::new();
        let mut controller = TelemetryController::new(status.clone());
        let mut latest = controller.latest();

        let source = TelemetrySource {
            device_path,
            log_path: tmp_dir.path().join("sensor_data.csv"),
            poll_interval: Duration::from_millis(10),
        };
        controller
            .start(&source, mediator(&metrics), metrics.clone())
            .await
            .unwrap();
        assert_eq!(status.current().telemetry, ComponentStatus::Running);

        latest.wait_for(|record| record.is_some()).await.unwrap();
        assert_eq!(
            latest.borrow().as_ref().map(|r| r.roll.clone()),
            Some("4°".to_string())
        );

        controller.stop().await.unwrap();
        assert_eq!(status.current().telemetry, ComponentStatus::Stopped);

        let log = std::fs::read_to_string(&source.log_path).unwrap();
        assert!(log.starts_with("Roll,Temp,Posture,Distance,Button,Received At,Raw"));
        assert_eq!(log.lines().count(), 2);
    }
}
