//! Alerting types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Monitored line-crossing lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Lc1,
    Lc2,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Lc1 => "lc1",
            Lane::Lc2 => "lc2",
        }
    }
}

/// Alert severity, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Danger,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Danger => "danger",
        }
    }
}

/// One directional-violation event emitted by the detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertEvent {
    pub lane: Lane,
    /// Observed increase of the exit counter since the previous poll
    pub increment: i64,
    /// Timestamp of the sample that triggered the alert
    pub timestamp: String,
}

/// Stored alert row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredAlert {
    pub id: i64,
    pub timestamp: String,
    pub alert_type: String,
    pub severity: String,
    pub line_crossing: Option<String>,
    pub object_type: Option<String>,
    pub message: Option<String>,
    pub acknowledged: i64,
}
