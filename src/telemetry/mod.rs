pub mod alerts;
pub mod controller;
pub mod ingest;
pub mod log;
pub mod loop_worker;
pub mod parser;

pub use alerts::{update_alerts, update_button, AlertEvent, AlertState};
pub use controller::{TelemetryController, TelemetrySource, NO_TELEMETRY};
pub use ingest::{IngestOutcome, LatestTelemetry, TelemetryIngest};
pub use log::{CsvSensorLog, SensorLogWriter, TelemetrySink};
pub use loop_worker::TelemetryError;
pub use parser::{parse, parse_device_notice, DeviceNotice, ParseError, MIN_FIELDS};
