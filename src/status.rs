use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum ComponentStatus {
    Starting,
    Running,
    /// Component intentionally off, e.g. no sensor attached.
    Disabled(String),
    /// Component halted on a backend failure and needs a restart.
    Failed(String),
    Stopped,
}

impl Default for ComponentStatus {
    fn default() -> Self {
        ComponentStatus::Starting
    }
}

/// User-visible health of the components that can degrade at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub voice: ComponentStatus,
    pub telemetry: ComponentStatus,
}

#[derive(Clone)]
pub struct StatusBoard {
    tx: watch::Sender<RuntimeStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RuntimeStatus::default());
        Self { tx }
    }

    pub fn report_voice(&self, status: ComponentStatus) {
        self.tx.send_modify(|current| current.voice = status);
    }

    pub fn report_telemetry(&self, status: ComponentStatus) {
        self.tx.send_modify(|current| current.telemetry = status);
    }

    pub fn current(&self) -> RuntimeStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RuntimeStatus> {
        self.tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
