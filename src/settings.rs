use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceSettings {
    /// Number of raw readings averaged per subject.
    pub window_size: usize,
    pub focal_length_px: f64,
    /// Real-world width of each detector class, in centimeters.
    pub reference_widths_cm: BTreeMap<String, f64>,
    /// Smoothed distance at or below which a moving subject counts as approaching.
    pub proximity_cm: f64,
    pub movement_threshold_px: f64,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        let reference_widths_cm = [
            ("face", 14.0),
            ("person", 40.0),
            ("cell phone", 7.0),
            ("laptop", 35.0),
            ("bottle", 8.0),
        ]
        .into_iter()
        .map(|(name, width)| (name.to_string(), width))
        .collect();

        Self {
            window_size: 10,
            focal_length_px: 600.0,
            reference_widths_cm,
            proximity_cm: 20.0,
            movement_threshold_px: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementSettings {
    pub cooldown_secs: u64,
    pub queue_capacity: usize,
}

impl Default for AnnouncementSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 3,
            queue_capacity: 32,
        }
    }
}

impl AnnouncementSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub wake_phrase: String,
    pub ack_phrase: String,
    pub retry_prompt: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            wake_phrase: "hello".into(),
            ack_phrase: "Wake word detected. Please say your command.".into(),
            retry_prompt: "Could not understand. Try again.".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub device_path: PathBuf,
    /// Wait between reads once the device has no buffered lines.
    pub poll_interval_ms: u64,
    /// Relative paths resolve against the data directory.
    pub log_path: PathBuf,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            device_path: PathBuf::from("/dev/ttyUSB0"),
            poll_interval_ms: 1000,
            log_path: PathBuf::from("sensor_data.csv"),
        }
    }
}

impl TelemetrySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Relative paths resolve against the data directory.
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("detections.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub distance: DistanceSettings,
    pub announcements: AnnouncementSettings,
    pub voice: VoiceSettings,
    pub telemetry: TelemetrySettings,
    pub storage: StorageSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<RuntimeSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, writing the defaults out when the file does not exist yet.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {} ({err}); using defaults",
                        path.display()
                    );
                    RuntimeSettings::default()
                }
            }
        } else {
            let defaults = RuntimeSettings::default();
            persist(&path, &defaults)?;
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn snapshot(&self) -> RuntimeSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn persist(path: &Path, data: &RuntimeSettings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_writes_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(path.exists());

        let settings = store.snapshot();
        assert_eq!(settings.distance.window_size, 10);
        assert_eq!(settings.distance.reference_widths_cm.get("face"), Some(&14.0));
        assert_eq!(settings.voice.wake_phrase, "hello");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "announcements": { "cooldown_secs": 8 } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().snapshot();
        assert_eq!(settings.announcements.cooldown_secs, 8);
        assert_eq!(settings.announcements.queue_capacity, 32);
        assert_eq!(settings.telemetry.poll_interval_ms, 1000);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/var/lib/assistwear");
        assert_eq!(
            resolve_path(base, Path::new("sensor_data.csv")),
            PathBuf::from("/var/lib/assistwear/sensor_data.csv")
        );
        assert_eq!(
            resolve_path(base, Path::new("/tmp/log.csv")),
            PathBuf::from("/tmp/log.csv")
        );
    }
}
