use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::announce::AnnouncementMediator;
use crate::metrics::{Counter, MetricsCollector};
use crate::models::TelemetryRecord;

use super::alerts::{update_alerts, update_button, AlertEvent, AlertState};
use super::log::SensorLogWriter;
use super::parser::{parse, parse_device_notice, DeviceNotice, ParseError};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub type LatestTelemetry = watch::Receiver<Option<TelemetryRecord>>;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Blank,
    Notice {
        notice: DeviceNotice,
        alerts: Vec<AlertEvent>,
    },
    Accepted {
        record: TelemetryRecord,
        alerts: Vec<AlertEvent>,
    },
    Rejected(ParseError),
}

/// Owns the alert debounce state and everything downstream of one parsed line.
pub struct TelemetryIngest {
    alert_state: AlertState,
    sensor_log: SensorLogWriter,
    latest: Arc<watch::Sender<Option<TelemetryRecord>>>,
    mediator: AnnouncementMediator,
    metrics: MetricsCollector,
}

impl TelemetryIngest {
    pub fn new(
        sensor_log: SensorLogWriter,
        latest: Arc<watch::Sender<Option<TelemetryRecord>>>,
        mediator: AnnouncementMediator,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            alert_state: AlertState::default(),
            sensor_log,
            latest,
            mediator,
            metrics,
        }
    }

    pub fn alert_state(&self) -> AlertState {
        self.alert_state
    }

    fn raise(&self, alerts: &[AlertEvent]) {
        for alert in alerts {
            self.metrics.incr(Counter::AlertsRaised);
            self.mediator.offer_now(&alert.to_announcement());
        }
    }

    pub fn ingest(&mut self, line: &str, received_at: DateTime<Utc>) -> IngestOutcome {
        let line = line.trim();
        if line.is_empty() {
            return IngestOutcome::Blank;
        }

        if let Some(notice) = parse_device_notice(line) {
            let alerts = match notice {
                DeviceNotice::Mode { data_enabled } => {
                    log_info!(
                        "Sensor mode changed: {}",
                        if data_enabled { "data enabled" } else { "button only" }
                    );
                    Vec::new()
                }
                DeviceNotice::ButtonState { pressed } => {
                    update_button(pressed, &mut self.alert_state).into_iter().collect()
                }
            };
            self.raise(&alerts);
            return IngestOutcome::Notice { notice, alerts };
        }

        let record = match parse(line) {
            Ok(record) => record,
            Err(err) => {
                self.metrics.incr(Counter::TelemetryParseErrors);
                log_warn!("Dropped telemetry line '{line}': {err}");
                return IngestOutcome::Rejected(err);
            }
        };

        self.metrics.incr(Counter::TelemetryRecords);
        log_debug!("Telemetry accepted: {}", record.raw);

        let alerts = update_alerts(&record, &mut self.alert_state);
        self.raise(&alerts);

        self.sensor_log.append(record.clone(), received_at);
        self.latest.send_replace(Some(record.clone()));
        IngestOutcome::Accepted { record, alerts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Posture;
    use crate::telemetry::log::TelemetrySink;
    use crate::test_support::RecordingSpeaker;
    use anyhow::{bail, Result};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MemorySink {
        rows: Arc<Mutex<Vec<TelemetryRecord>>>,
        fail: bool,
    }

    impl TelemetrySink for MemorySink {
        fn append(&mut self, record: &TelemetryRecord, _received_at: DateTime<Utc>) -> Result<()> {
            if self.fail {
                bail!("disk full");
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Fixture {
        ingest: TelemetryIngest,
        rows: Arc<Mutex<Vec<TelemetryRecord>>>,
        latest: LatestTelemetry,
        speaker: RecordingSpeaker,
        mediator: AnnouncementMediator,
        metrics: MetricsCollector,
    }

    fn fixture(fail_log: bool) -> Fixture {
        let metrics = MetricsCollector::new();
        let speaker = RecordingSpeaker::new();
        let mediator = AnnouncementMediator::new(
            Box::new(speaker.clone()),
            Duration::from_secs(3),
            32,
            None,
            metrics.clone(),
        )
        .unwrap();
        let sink = MemorySink {
            fail: fail_log,
            ..MemorySink::default()
        };
        let rows = Arc::clone(&sink.rows);
        let (tx, latest) = watch::channel(None);

        Fixture {
            ingest: TelemetryIngest::new(
                SensorLogWriter::spawn(Box::new(sink), metrics.clone()).unwrap(),
                Arc::new(tx),
                mediator.clone(),
                metrics.clone(),
            ),
            rows,
            latest,
            speaker,
            mediator,
            metrics,
        }
    }

    #[test]
    fn accepted_line_is_logged_published_and_alerts() {
        let mut fx = fixture(false);
        let line = "Roll: 5, Temp: 36, X: a, Posture: Bad, Y: b, Button: Yes";

        let outcome = fx.ingest.ingest(line, Utc::now());
        let IngestOutcome::Accepted { record, alerts } = outcome else {
            panic!("expected accepted record");
        };
        assert_eq!(alerts, vec![AlertEvent::PostureAlert, AlertEvent::ButtonAlert]);
        assert_eq!(record.posture, Posture::Bad);

        // Same reading again: logged, no new alerts.
        let again = fx.ingest.ingest(line, Utc::now());
        assert!(matches!(again, IngestOutcome::Accepted { ref alerts, .. } if alerts.is_empty()));

        // Dropping the ingest drains the sensor log thread.
        drop(fx.ingest);
        assert_eq!(fx.rows.lock().unwrap().len(), 2);
        assert_eq!(fx.latest.borrow().as_ref().map(|r| r.temperature.as_str()), Some("36"));

        fx.mediator.close();
        assert_eq!(
            fx.speaker.spoken(),
            vec![
                "Maintain posture.".to_string(),
                "Help requested. Button pressed.".to_string()
            ]
        );
        let counts = fx.metrics.counts();
        assert_eq!(counts.telemetry_records, 2);
        assert_eq!(counts.alerts_raised, 2);
    }

    #[test]
    fn malformed_line_is_counted_not_stored() {
        let mut fx = fixture(false);

        let outcome = fx.ingest.ingest("Roll: 5", Utc::now());
        assert!(matches!(outcome, IngestOutcome::Rejected(ParseError::TooFewFields { .. })));
        assert_eq!(fx.ingest.alert_state(), AlertState::default());
        drop(fx.ingest);
        assert!(fx.rows.lock().unwrap().is_empty());
        assert!(fx.latest.borrow().is_none());
        assert_eq!(fx.metrics.counts().telemetry_parse_errors, 1);
    }

    #[test]
    fn button_only_notices_drive_button_alert() {
        let mut fx = fixture(false);

        assert_eq!(fx.ingest.ingest("\r\n", Utc::now()), IngestOutcome::Blank);
        let mode = fx.ingest.ingest("Mode: Button Only", Utc::now());
        assert!(matches!(mode, IngestOutcome::Notice { ref alerts, .. } if alerts.is_empty()));

        let pressed = fx.ingest.ingest("Button Pressed: Yes", Utc::now());
        assert_eq!(
            pressed,
            IngestOutcome::Notice {
                notice: DeviceNotice::ButtonState { pressed: true },
                alerts: vec![AlertEvent::ButtonAlert],
            }
        );
        let held = fx.ingest.ingest("Button Pressed: Yes", Utc::now());
        assert!(matches!(held, IngestOutcome::Notice { ref alerts, .. } if alerts.is_empty()));

        drop(fx.ingest);
        assert!(fx.rows.lock().unwrap().is_empty());
        assert_eq!(fx.metrics.counts().telemetry_parse_errors, 0);

        fx.mediator.close();
        assert_eq!(fx.speaker.spoken(), vec!["Help requested. Button pressed.".to_string()]);
    }

    #[test]
    fn log_failure_is_counted_but_record_still_published() {
        let mut fx = fixture(true);

        let outcome = fx
            .ingest
            .ingest("Roll: 1, Temp: 30, Posture: Good, Distance: 9cm, Button: No", Utc::now());
        assert!(matches!(outcome, IngestOutcome::Accepted { .. }));
        assert!(fx.latest.borrow().is_some());
        drop(fx.ingest);
        assert_eq!(fx.metrics.counts().telemetry_log_failures, 1);
    }
}
