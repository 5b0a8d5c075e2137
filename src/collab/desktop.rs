// src/collab/desktop.rs

use super::Collaborator;
use crate::analytics_log::{AnalyticsEvent, AnalyticsLog};
use crate::error::{AppResult, UserMsgKind};

use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Toasts disappear on their own after this long.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

const MAX_PENDING_ANNOUNCEMENTS: usize = 32;

fn email_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: UserMsgKind,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Default)]
struct ToastSlot {
    current: Option<Notification>,
    next_id: u64,
}

/// Collaborator backing the egui front end.
///
/// Announcements and toasts are queued for the UI to drain each frame;
/// analytics go to the JSONL event log when one is attached.
pub struct DesktopCollaborator {
    announcements: Mutex<VecDeque<String>>,
    toast: Mutex<ToastSlot>,
    analytics: Option<Mutex<AnalyticsLog>>,
}

impl DesktopCollaborator {
    pub fn new(analytics: Option<AnalyticsLog>) -> Self {
        Self {
            announcements: Mutex::new(VecDeque::new()),
            toast: Mutex::new(ToastSlot::default()),
            analytics: analytics.map(Mutex::new),
        }
    }

    /// Collaborator with its analytics log under `app_data_dir`.
    pub fn with_log_dir(app_data_dir: &Path) -> AppResult<Self> {
        Ok(Self::new(Some(AnalyticsLog::open(app_data_dir)?)))
    }

    pub fn take_announcements(&self) -> Vec<String> {
        match self.announcements.lock() {
            Ok(mut q) => q.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Current toast, if any and not yet expired.
    pub fn current_notification(&self) -> Option<Notification> {
        let mut slot = self.toast.lock().ok()?;
        let expired = slot
            .current
            .as_ref()
            .map(|n| n.shown_at.elapsed() >= NOTIFICATION_TTL)
            .unwrap_or(false);
        if expired {
            slot.current = None;
        }
        slot.current.clone()
    }

    /// Up to `n` latest tracked events, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<AnalyticsEvent> {
        self.analytics
            .as_ref()
            .and_then(|m| m.lock().ok().map(|log| log.recent(n)))
            .unwrap_or_default()
    }
}

impl Collaborator for DesktopCollaborator {
    fn announce(&self, message: &str) {
        tracing::debug!(%message, "announce");
        if let Ok(mut q) = self.announcements.lock() {
            if q.len() >= MAX_PENDING_ANNOUNCEMENTS {
                q.pop_front();
            }
            q.push_back(message.to_string());
        }
    }

    fn show_notification(&self, message: &str, kind: UserMsgKind) -> u64 {
        let Ok(mut slot) = self.toast.lock() else {
            return 0;
        };
        slot.next_id = slot.next_id.saturating_add(1);
        let id = slot.next_id;
        slot.current = Some(Notification {
            id,
            kind,
            message: message.to_string(),
            shown_at: Instant::now(),
        });
        id
    }

    fn hide_notification(&self, id: u64) {
        if let Ok(mut slot) = self.toast.lock() {
            if slot.current.as_ref().map(|n| n.id) == Some(id) {
                slot.current = None;
            }
        }
    }

    fn validate_email(&self, email: &str) -> bool {
        email_re()
            .map(|re| re.is_match(email.trim()))
            .unwrap_or(false)
    }

    fn track_event(&self, name: &str, props: JsonValue) {
        tracing::info!(event = name, %props, "analytics event");
        if let Some(m) = self.analytics.as_ref() {
            if let Ok(mut log) = m.lock() {
                log.record(name, props);
            }
        }
    }
}

// ======================================================
// Unit Tests
// ======================================================
