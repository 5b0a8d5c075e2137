// tests/common/mod.rs

#![allow(dead_code)]

use care_questionnaire_lib::{
    collab::{Collaborator, DesktopCollaborator},
    command::questionnaire::{self as q, ClientEnv, FormCtx, QuestionnaireState},
    context::AppCtx,
    snapshot_store::SnapshotStore,
    template::questionnaire::{FieldKind, TextFormat},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct TestEnv {
    // Keep the tempdir alive for the duration of the test.
    td: tempfile::TempDir,

    ctx: AppCtx,
    pub collab: Arc<DesktopCollaborator>,
}

impl TestEnv {
    pub fn new() -> Self {
        let td = tempfile::tempdir().expect("tempdir");
        let ctx = AppCtx::new(td.path().to_path_buf());
        let collab = Arc::new(
            DesktopCollaborator::with_log_dir(td.path()).expect("collaborator with log"),
        );
        Self { td, ctx, collab }
    }

    pub fn ctx(&self) -> &AppCtx {
        &self.ctx
    }

    pub fn dir(&self) -> &std::path::Path {
        self.td.path()
    }

    /// A fresh per-run context over the same data dir, as after a restart.
    pub fn form_ctx(&self) -> FormCtx {
        let collab: Arc<dyn Collaborator> = self.collab.clone();
        FormCtx::new(SnapshotStore::in_dir(self.dir()))
            .with_collaborator(collab)
            .with_client(ClientEnv::desktop(1280, 800))
    }

    pub fn start_at(&self, fctx: &FormCtx, now: DateTime<Utc>) -> QuestionnaireState {
        let registry = q::load_builtin_questionnaire().expect("builtin schema");
        q::start(registry, fctx, now)
    }

    pub fn start(&self, fctx: &FormCtx) -> QuestionnaireState {
        self.start_at(fctx, Utc::now())
    }
}

/// Answer every visible, required, unanswered field of section `n`.
pub fn fill_section(state: &mut QuestionnaireState, fctx: &FormCtx, n: usize) {
    let specs = state
        .registry
        .section(n)
        .expect("section exists")
        .fields
        .clone();

    for spec in specs {
        let st = state.model.get(&spec.name).expect("field state");
        let answered = st.value.any_checked()
            || st.value.raw().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if st.hidden || !st.required || answered {
            continue;
        }

        match spec.kind {
            FieldKind::SingleChoice => {
                q::click_option_row(state, fctx, &spec.name, &spec.options[0].value)
                    .expect("single choice")
            }
            FieldKind::MultiChoice => {
                let v = spec
                    .options
                    .iter()
                    .find(|o| !state.registry.is_sentinel(&o.value))
                    .expect("non-sentinel option")
                    .value
                    .clone();
                q::click_option_row(state, fctx, &spec.name, &v).expect("multi choice")
            }
            FieldKind::Rating => q::click_rating(state, fctx, &spec.name, "4").expect("rating"),
            FieldKind::Text if spec.format == Some(TextFormat::Email) => {
                q::set_text(state, fctx, &spec.name, "sam@example.org").expect("email")
            }
            FieldKind::Text => q::set_text(state, fctx, &spec.name, "Some text").expect("text"),
            FieldKind::Hidden => {}
        }
    }
}

/// Fill and advance through every section up to the last one (also filled).
pub fn complete_all(state: &mut QuestionnaireState, fctx: &FormCtx) {
    let total = state.total_sections();
    for n in 1..total {
        fill_section(state, fctx, n);
        assert!(q::advance(state, fctx), "advance from section {n}");
    }
    fill_section(state, fctx, total);
}
