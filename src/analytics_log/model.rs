// src/analytics_log/model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const LOG_FILE_NAME: &str = "analytics.log.jsonl";
pub const LOG_BACKUP_NAME: &str = "analytics.log.jsonl.1";

/// The live file is moved to the backup once it grows past this.
pub const ROTATE_AT_BYTES: u64 = 2 * 1024 * 1024;

/// Events kept in memory for the UI and tests.
pub const RECENT_EVENTS: usize = 200;

/// One tracked interaction, stored as a JSONL line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub at: DateTime<Utc>,
    /// Random tag shared by every event of one app run.
    pub session: String,
    pub name: String,
    pub props: JsonValue,
}
