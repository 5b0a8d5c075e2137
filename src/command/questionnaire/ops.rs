// src/command/questionnaire/ops.rs

use crate::context::AppCtx;
use crate::template::questionnaire::{builtin_template, load_template_path};
use crate::template::registry::FieldRegistry;

use super::persist;
use super::types::{FormCtx, QuestionnaireError, QuestionnaireState};

use chrono::{DateTime, Utc};
use std::path::Path;

pub fn load_questionnaire_from_path(
    path: impl AsRef<Path>,
) -> Result<FieldRegistry, QuestionnaireError> {
    Ok(FieldRegistry::from_template(load_template_path(path)?))
}

pub fn load_builtin_questionnaire() -> Result<FieldRegistry, QuestionnaireError> {
    Ok(FieldRegistry::from_template(builtin_template()?))
}

/// Schema override from the context when configured, bundled schema otherwise.
pub fn load_questionnaire_for_ctx(ctx: &AppCtx) -> Result<FieldRegistry, QuestionnaireError> {
    match ctx.schema_path.as_ref() {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading questionnaire schema override");
            load_questionnaire_from_path(p)
        }
        None => load_builtin_questionnaire(),
    }
}

/// Page-load entry point: fresh state, then restore-or-start.
///
/// Restores a snapshot younger than 24 hours, applies the conditional rules
/// and shows the saved (or first) section.
pub fn start(registry: FieldRegistry, fctx: &FormCtx, now: DateTime<Utc>) -> QuestionnaireState {
    let mut state = QuestionnaireState::new(registry, now);
    let restored = persist::load(&mut state, fctx, now);
    tracing::info!(
        restored,
        section = state.nav.current_section,
        total = state.nav.total_sections,
        "questionnaire started"
    );
    state
}

// ======================================================
// Unit Tests
// ======================================================
