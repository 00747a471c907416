use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Posture {
    Good,
    Bad,
    Unknown,
}

impl Default for Posture {
    fn default() -> Self {
        Posture::Unknown
    }
}

impl Posture {
    pub fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("good") {
            Posture::Good
        } else if value.eq_ignore_ascii_case("bad") {
            Posture::Bad
        } else {
            Posture::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Posture::Good => "Good",
            Posture::Bad => "Bad",
            Posture::Unknown => "Unknown",
        }
    }
}

/// One fully parsed line from the body-worn sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub roll: String,
    pub temperature: String,
    pub posture: Posture,
    pub distance: Option<String>,
    pub button: bool,
    pub raw: String,
}
