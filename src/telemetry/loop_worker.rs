use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use super::ingest::TelemetryIngest;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("sensor device {path} not available: {reason}")]
    DeviceAbsent { path: String, reason: String },
    #[error("sensor stream read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Consume the sensor stream line by line until cancelled.
///
/// A serial port has no push notification for "more data later", so when the
/// reader reports end of input the loop waits `poll_interval` and reads again.
/// A line cut off by end of input is kept and completed by the next read.
pub async fn telemetry_loop<R>(
    mut reader: R,
    mut ingest: TelemetryIngest,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) -> Result<(), TelemetryError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    let result = loop {
        let read = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("telemetry loop shutting down");
                break Ok(());
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(_) if buf.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&buf);
                ingest.ingest(&line, Utc::now());
                buf.clear();
            }
            Ok(_) => {
                if !buf.is_empty() {
                    log_debug!("Partial sensor line buffered ({} bytes)", buf.len());
                }
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        log_info!("telemetry loop shutting down");
                        break Ok(());
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(err) => {
                log_error!("Sensor read failed: {err}");
                break Err(TelemetryError::Read(err));
            }
        }
    };

    // Dropping the ingest joins the sensor log thread.
    if let Err(err) = tokio::task::spawn_blocking(move || drop(ingest)).await {
        log_error!("Failed to close sensor log: {err}");
    }

    result
}
