use thiserror::Error;

use crate::models::{Posture, TelemetryRecord};

/// Lines with fewer non-blank fields than this are dropped.
pub const MIN_FIELDS: usize = 5;

const FIELD_DELIMITER: char = ',';
const LABEL_SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least {required} fields, found {found}")]
    TooFewFields { found: usize, required: usize },
    #[error("field '{field}' has no ': ' separator")]
    MissingSeparator { field: String },
    #[error("required field '{0}' missing")]
    MissingField(&'static str),
}

/// Status lines the sensor prints outside the regular data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceNotice {
    /// `Mode: Data Enabled` or `Mode: Button Only`.
    Mode { data_enabled: bool },
    /// `Button Pressed: Yes|No`, sent while full data is switched off.
    ButtonState { pressed: bool },
}

fn is_truthy(value: &str) -> bool {
    ["yes", "true", "1", "pressed"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
}

pub fn parse_device_notice(line: &str) -> Option<DeviceNotice> {
    let (label, value) = line.trim().split_once(LABEL_SEPARATOR)?;
    let label = label.trim();
    let value = value.trim();

    if label.eq_ignore_ascii_case("mode") {
        if value.eq_ignore_ascii_case("data enabled") {
            return Some(DeviceNotice::Mode { data_enabled: true });
        }
        if value.eq_ignore_ascii_case("button only") {
            return Some(DeviceNotice::Mode { data_enabled: false });
        }
        return None;
    }

    if label.eq_ignore_ascii_case("button pressed") {
        return Some(DeviceNotice::ButtonState {
            pressed: is_truthy(value),
        });
    }

    None
}

/// Parse one `label: value` line from the sensor.
///
/// Blank fields are skipped and unknown labels are ignored, but both still
/// have to be well formed. Roll and Temp are mandatory.
pub fn parse(line: &str) -> Result<TelemetryRecord, ParseError> {
    let raw = line.trim();
    let fields: Vec<&str> = raw
        .split(FIELD_DELIMITER)
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();

    if fields.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            found: fields.len(),
            required: MIN_FIELDS,
        });
    }

    let mut roll = None;
    let mut temperature = None;
    let mut posture = Posture::Unknown;
    let mut distance = None;
    let mut button = false;

    for field in fields {
        let Some((label, value)) = field.split_once(LABEL_SEPARATOR) else {
            return Err(ParseError::MissingSeparator {
                field: field.to_string(),
            });
        };
        let value = value.trim();

        match label.trim().to_ascii_lowercase().as_str() {
            "roll" => roll = Some(value.to_string()),
            "temp" | "temperature" => temperature = Some(value.to_string()),
            "posture" => posture = Posture::from_value(value),
            "distance" => distance = Some(value.to_string()),
            "button" => button = is_truthy(value),
            _ => {}
        }
    }

    Ok(TelemetryRecord {
        roll: roll.ok_or(ParseError::MissingField("Roll"))?,
        temperature: temperature.ok_or(ParseError::MissingField("Temp"))?,
        posture,
        distance,
        button,
        raw: raw.to_string(),
    })
}
