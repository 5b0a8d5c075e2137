// src/command/questionnaire/types.rs

use crate::collab::Collaborator;
use crate::context::APP_ID;
use crate::error::{AppError, UserMsgKind};
use crate::snapshot_store::SnapshotStore;
use crate::template::questionnaire::{Motivation, TemplateLoadError};
use crate::template::registry::FieldRegistry;

use super::form::FormModel;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const MILESTONE_TITLE: &str = "Halfway Complete!";
pub const MILESTONE_BODY: &str = "Your profile is already much more detailed than any free service. \
The AI is building a comprehensive picture of your needs.";

/// Everything the questionnaire knows, owned in one place.
///
/// Handlers take `&mut QuestionnaireState` plus a `&FormCtx`; there is no
/// other mutable state.
#[derive(Debug, Clone)]
pub struct QuestionnaireState {
    pub registry: FieldRegistry,
    pub model: FormModel,
    pub nav: NavState,
    pub view: ViewState,
    pub started_at: DateTime<Utc>,
    /// Set while a submission is in flight, and kept after a confirmed one.
    pub submit_busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    /// 1-based.
    pub current_section: usize,
    pub total_sections: usize,
    pub milestone_shown: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTier {
    Early,
    Halfway,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: f32,
    pub counter: String,
    pub motivation: Option<Motivation>,
    pub tier: ProgressTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneNotice {
    pub title: &'static str,
    pub body: &'static str,
}

/// Derived presentation state; rebuilt by `render` and `update_progress`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Index 0 is section 1.
    pub sections_visible: Vec<bool>,
    pub prev_visible: bool,
    pub next_visible: bool,
    pub submit_visible: bool,
    pub progress: Progress,
    /// Pending one-shot notice; the UI takes it.
    pub milestone: Option<MilestoneNotice>,
    pub scroll_to_top: bool,
}

impl ViewState {
    pub fn new(total_sections: usize) -> Self {
        Self {
            sections_visible: vec![false; total_sections],
            prev_visible: false,
            next_visible: false,
            submit_visible: false,
            progress: Progress {
                percent: 0.0,
                counter: String::new(),
                motivation: None,
                tier: ProgressTier::Early,
            },
            milestone: None,
            scroll_to_top: false,
        }
    }

    pub fn visible_sections(&self) -> Vec<usize> {
        self.sections_visible
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

impl QuestionnaireState {
    pub fn new(registry: FieldRegistry, started_at: DateTime<Utc>) -> Self {
        let total = registry.section_count();
        let model = FormModel::new(&registry);
        Self {
            registry,
            model,
            nav: NavState {
                current_section: 1,
                total_sections: total,
                milestone_shown: false,
            },
            view: ViewState::new(total),
            started_at,
            submit_busy: false,
        }
    }

    pub fn current_section(&self) -> usize {
        self.nav.current_section
    }

    pub fn total_sections(&self) -> usize {
        self.nav.total_sections
    }
}

/// Client description reported in submission metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnv {
    pub user_agent: String,
    pub screen_resolution: String,
}

impl ClientEnv {
    pub fn desktop(width: u32, height: u32) -> Self {
        Self {
            user_agent: format!(
                "{APP_ID}/{} ({})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            screen_resolution: format!("{width}x{height}"),
        }
    }
}

impl Default for ClientEnv {
    fn default() -> Self {
        Self::desktop(0, 0)
    }
}

/// Per-run collaborators handed to every handler.
pub struct FormCtx {
    pub store: SnapshotStore,
    pub collab: Option<Arc<dyn Collaborator>>,
    pub client: ClientEnv,
}

impl FormCtx {
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            collab: None,
            client: ClientEnv::default(),
        }
    }

    pub fn with_collaborator(mut self, collab: Arc<dyn Collaborator>) -> Self {
        self.collab = Some(collab);
        self
    }

    pub fn with_client(mut self, client: ClientEnv) -> Self {
        self.client = client;
        self
    }

    pub(crate) fn announce(&self, message: &str) {
        if let Some(c) = self.collab.as_ref() {
            c.announce(message);
        }
    }

    pub(crate) fn notify(&self, message: &str, kind: UserMsgKind) {
        if let Some(c) = self.collab.as_ref() {
            c.show_notification(message, kind);
        }
    }

    pub(crate) fn track(&self, name: &str, props: JsonValue) {
        if let Some(c) = self.collab.as_ref() {
            c.track_event(name, props);
        }
    }
}

#[derive(Debug)]
pub enum QuestionnaireError {
    App(AppError),
    Template(TemplateLoadError),
    InvalidSectionIndex {
        section: usize,
        section_count: usize,
    },
    UnknownField(String),
    InvalidValue {
        field: String,
        value: String,
    },
    KindMismatch {
        field: String,
        expected: &'static str,
    },
}

impl std::fmt::Display for QuestionnaireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionnaireError::App(e) => write!(f, "{e}"),
            QuestionnaireError::Template(e) => write!(f, "{e}"),
            QuestionnaireError::InvalidSectionIndex {
                section,
                section_count,
            } => write!(
                f,
                "invalid section {section}; section_count={section_count}"
            ),
            QuestionnaireError::UnknownField(name) => write!(f, "unknown field '{name}'"),
            QuestionnaireError::InvalidValue { field, value } => {
                write!(f, "'{value}' is not a valid value for '{field}'")
            }
            QuestionnaireError::KindMismatch { field, expected } => {
                write!(f, "field '{field}' is not a {expected} field")
            }
        }
    }
}

impl std::error::Error for QuestionnaireError {}

impl From<AppError> for QuestionnaireError {
    fn from(e: AppError) -> Self {
        QuestionnaireError::App(e)
    }
}

impl From<TemplateLoadError> for QuestionnaireError {
    fn from(e: TemplateLoadError) -> Self {
        QuestionnaireError::Template(e)
    }
}
