// src/collab/mod.rs

//! Host services the questionnaire core calls out to.
//!
//! The core holds an `Option<Arc<dyn Collaborator>>`; with `None` every call
//! site degrades silently (no announcements, no toasts, no email format check,
//! no analytics).

mod desktop;

pub use desktop::{DesktopCollaborator, Notification, NOTIFICATION_TTL};

use crate::error::UserMsgKind;
use serde_json::Value as JsonValue;

pub trait Collaborator: Send + Sync {
    /// Screen-reader style announcement.
    fn announce(&self, message: &str);

    /// Show a toast, replacing any current one. Returns its id.
    fn show_notification(&self, message: &str, kind: UserMsgKind) -> u64;

    fn hide_notification(&self, id: u64);

    fn validate_email(&self, email: &str) -> bool;

    fn track_event(&self, name: &str, props: JsonValue);
}
