// src/analytics_log/store.rs

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};

use super::model::{AnalyticsEvent, LOG_BACKUP_NAME, LOG_FILE_NAME, RECENT_EVENTS, ROTATE_AT_BYTES};

/// Append-only analytics history plus the last `RECENT_EVENTS` in memory.
pub struct AnalyticsLog {
    path: PathBuf,
    session: String,
    recent: VecDeque<AnalyticsEvent>,
    rotate_at: u64,
}

impl AnalyticsLog {
    pub fn open(app_data_dir: &Path) -> AppResult<Self> {
        fs::create_dir_all(app_data_dir)
            .map_err(|e| AppError::Msg(format!("analytics log dir create: {e}")))?;

        let path = app_data_dir.join(LOG_FILE_NAME);
        let recent = read_recent(&path, RECENT_EVENTS);

        let mut tag = [0u8; 6];
        OsRng.fill_bytes(&mut tag);

        Ok(Self {
            path,
            session: hex::encode(tag),
            recent,
            rotate_at: ROTATE_AT_BYTES,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Remember and persist one event. Disk failures are logged, never returned.
    pub fn record(&mut self, name: &str, props: JsonValue) -> AnalyticsEvent {
        let ev = AnalyticsEvent {
            at: Utc::now(),
            session: self.session.clone(),
            name: name.to_string(),
            props,
        };

        if self.recent.len() >= RECENT_EVENTS {
            self.recent.pop_front();
        }
        self.recent.push_back(ev.clone());

        if let Err(e) = self.persist(&ev) {
            tracing::warn!(error = %e, event = name, "analytics event not persisted");
        }

        ev
    }

    /// Up to `n` latest events, oldest first. Includes earlier runs.
    pub fn recent(&self, n: usize) -> Vec<AnalyticsEvent> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    fn persist(&self, ev: &AnalyticsEvent) -> Result<(), String> {
        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size >= self.rotate_at {
            let backup = self.path.with_file_name(LOG_BACKUP_NAME);
            let _ = fs::remove_file(&backup);
            fs::rename(&self.path, &backup).map_err(|e| format!("rotate: {e}"))?;
            tracing::debug!(bytes = size, "analytics log rotated");
        }

        let mut line = serde_json::to_string(ev).map_err(|e| format!("encode: {e}"))?;
        line.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
            .map_err(|e| format!("append: {e}"))
    }
}

/// Last `n` parseable events of the live file. Rotation keeps it small enough to read whole.
fn read_recent(path: &Path, n: usize) -> VecDeque<AnalyticsEvent> {
    let Ok(text) = fs::read_to_string(path) else {
        return VecDeque::new();
    };

    let mut out: Vec<AnalyticsEvent> = text
        .lines()
        .rev()
        .filter_map(|l| serde_json::from_str(l).ok())
        .take(n)
        .collect();
    out.reverse();
    out.into()
}

// ======================================================
// Unit Tests
// ======================================================
