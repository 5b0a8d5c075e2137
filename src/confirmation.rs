// src/confirmation.rs

//! Confirmation page: redirect parameters, reference numbers and the
//! completion record.

use crate::collab::Collaborator;
use crate::command::questionnaire::ClientEnv;
use crate::error::{AppError, AppResult, UserMsgKind};
use crate::snapshot_store::{write_atomic, Durability};

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIRMATION_PAGE: &str = "confirmation";
pub const PARAM_COMPLETED: &str = "completed";
pub const PARAM_REF: &str = "ref";

pub const COMPLETION_EVENT: &str = "assessment_completion";
pub const COMPLETION_SOURCE: &str = "questionnaire";
pub const SUCCESS_NOTIFICATION: &str =
    "Assessment submitted successfully! Check your email for confirmation.";

/// Delay between arriving on the page and the success toast.
pub const NOTIFICATION_DELAY: Duration = Duration::from_secs(1);

/// `<prefix>-<year>-<last six digits of the epoch millis>`.
pub fn generate_reference(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    format!("{prefix}-{}-{millis:06}", now.year())
}

pub fn is_valid_reference(prefix: &str, s: &str) -> bool {
    Regex::new(&format!(r"^{}-\d{{4}}-\d{{6}}$", regex::escape(prefix)))
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

/// Where a confirmed submission navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationTarget {
    pub completed: bool,
    pub reference: String,
}

impl ConfirmationTarget {
    pub fn completed(reference: String) -> Self {
        Self {
            completed: true,
            reference,
        }
    }

    pub fn query_string(&self) -> String {
        format!(
            "{PARAM_COMPLETED}={}&{PARAM_REF}={}",
            self.completed,
            urlencoding::encode(&self.reference)
        )
    }

    /// `confirmation?completed=true&ref=RCH-2025-123456`
    pub fn location(&self) -> String {
        format!("{CONFIRMATION_PAGE}?{}", self.query_string())
    }
}

/// Parsed redirect parameters. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationParams {
    pub completed: bool,
    pub reference: Option<String>,
}

impl ConfirmationParams {
    /// Accepts a bare query (`a=b&c=d`), a leading `?`, or a full location.
    pub fn from_query(query: &str) -> Self {
        let q = match query.split_once('?') {
            Some((_, rest)) => rest,
            None => query,
        };

        let mut out = Self::default();
        for pair in q.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let v = urlencoding::decode(&v.replace('+', " "))
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| v.to_string());
            match k {
                PARAM_COMPLETED => out.completed = v == "true",
                PARAM_REF if !v.is_empty() => out.reference = Some(v),
                _ => {}
            }
        }
        out
    }
}

/// Stored after a completed visit to the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub timestamp: String,
    pub reference: String,
    pub user_agent: String,
    pub screen: String,
    pub completion_source: String,
}

impl CompletionRecord {
    pub fn write(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| AppError::CompletionRecordFailed(e.to_string()))?;
        write_atomic(path, &json, Durability::Sync)
            .map_err(|e| AppError::CompletionRecordFailed(e.to_string()))
    }

    pub fn read(path: &Path) -> AppResult<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::CompletionRecordFailed(e.to_string())),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| AppError::CompletionRecordFailed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationView {
    pub completed: bool,
    /// Displayed reference number.
    pub reference: String,
    pub record: Option<CompletionRecord>,
}

impl ConfirmationView {
    /// Show the confirmation page for `query`.
    ///
    /// With `completed=true` this tracks the completion, stores the
    /// last-completion record at `record_path` and queues the success toast
    /// (the UI delays it by `NOTIFICATION_DELAY`).
    pub fn open(
        query: &str,
        prefix: &str,
        client: &ClientEnv,
        collab: Option<&dyn Collaborator>,
        record_path: &Path,
        now: DateTime<Utc>,
    ) -> Self {
        let params = ConfirmationParams::from_query(query);

        let reference = params
            .reference
            .clone()
            .filter(|r| is_valid_reference(prefix, r))
            .unwrap_or_else(|| generate_reference(prefix, now));

        if !params.completed {
            return Self {
                completed: false,
                reference,
                record: None,
            };
        }

        let record = CompletionRecord {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            reference: params
                .reference
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            user_agent: client.user_agent.clone(),
            screen: client.screen_resolution.clone(),
            completion_source: COMPLETION_SOURCE.to_string(),
        };

        tracing::info!(reference = %record.reference, "assessment completion tracked");

        if let Err(e) = record.write(record_path) {
            tracing::warn!(error = %e, "storing completion record failed");
        }

        if let Some(c) = collab {
            match serde_json::to_value(&record) {
                Ok(props) => c.track_event(COMPLETION_EVENT, props),
                Err(e) => tracing::warn!(error = %e, "completion event encode failed"),
            }
        }

        Self {
            completed: true,
            reference,
            record: Some(record),
        }
    }

    /// Toast to show once `NOTIFICATION_DELAY` has passed.
    pub fn pending_notification(&self) -> Option<(&'static str, UserMsgKind)> {
        self.completed
            .then_some((SUCCESS_NOTIFICATION, UserMsgKind::Success))
    }
}

// ======================================================
// Unit Tests
// ======================================================
