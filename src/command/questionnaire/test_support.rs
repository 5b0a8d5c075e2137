// src/command/questionnaire/test_support.rs

#![cfg(test)]

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use super::binder::{click_option_row, click_rating, set_text};
use super::ops::{load_builtin_questionnaire, start};
use super::types::{FormCtx, QuestionnaireState};
use crate::collab::{Collaborator, DesktopCollaborator};
use crate::snapshot_store::{SnapshotStore, SnapshotValue};
use crate::template::questionnaire::{FieldKind, TextFormat};

thread_local! {
    // Concrete handles behind the `dyn Collaborator` given to each fixture.
    static COLLABS: RefCell<Vec<Arc<DesktopCollaborator>>> = RefCell::new(Vec::new());
}

fn mk_ctx(dir: &Path, with_collab: bool) -> FormCtx {
    let fctx = FormCtx::new(SnapshotStore::in_dir(dir));
    if !with_collab {
        return fctx;
    }
    let desk = Arc::new(DesktopCollaborator::new(None));
    COLLABS.with(|c| c.borrow_mut().push(desk.clone()));
    let collab: Arc<dyn Collaborator> = desk;
    fctx.with_collaborator(collab)
}

fn started(dir: &Path, with_collab: bool) -> (QuestionnaireState, FormCtx) {
    let fctx = mk_ctx(dir, with_collab);
    let registry = load_builtin_questionnaire().unwrap();
    let state = start(registry, &fctx, Utc::now());
    (state, fctx)
}

/// Bundled schema, desktop collaborator without analytics, empty temp dir.
pub fn fresh() -> (TempDir, QuestionnaireState, FormCtx) {
    let td = tempfile::tempdir().unwrap();
    let (state, fctx) = started(td.path(), true);
    (td, state, fctx)
}

pub fn fresh_without_collab() -> (TempDir, QuestionnaireState, FormCtx) {
    let td = tempfile::tempdir().unwrap();
    let (state, fctx) = started(td.path(), false);
    (td, state, fctx)
}

/// Start (or restore) against an existing directory.
pub fn fresh_in(dir: &Path) -> (QuestionnaireState, FormCtx) {
    started(dir, true)
}

/// Give every visible, required, unanswered field in section `n` a valid value.
///
/// Single choices take their first option, so `contact_004` becomes "myself"
/// and hides the patient name.
pub fn fill_section(state: &mut QuestionnaireState, fctx: &FormCtx, n: usize) {
    let specs = state.registry.section(n).unwrap().fields.clone();

    for spec in specs {
        // Re-read: an earlier answer in this section may have toggled it.
        let st = state.model.get(&spec.name).unwrap();
        let answered = st.value.any_checked()
            || st.value.raw().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if st.hidden || !st.required || answered {
            continue;
        }

        match spec.kind {
            FieldKind::SingleChoice => {
                click_option_row(state, fctx, &spec.name, &spec.options[0].value).unwrap();
            }
            FieldKind::MultiChoice => {
                let v = spec
                    .options
                    .iter()
                    .find(|o| !state.registry.is_sentinel(&o.value))
                    .unwrap()
                    .value
                    .clone();
                click_option_row(state, fctx, &spec.name, &v).unwrap();
            }
            FieldKind::Rating => click_rating(state, fctx, &spec.name, "3").unwrap(),
            FieldKind::Text if spec.format == Some(TextFormat::Email) => {
                set_text(state, fctx, &spec.name, "jane@example.com").unwrap()
            }
            FieldKind::Text => set_text(state, fctx, &spec.name, "Sample").unwrap(),
            // Hidden fields are never user-answered.
            FieldKind::Hidden => {}
        }
    }
}

/// Drain announcements made through `fctx`'s collaborator.
pub fn announcements(fctx: &FormCtx) -> Vec<String> {
    let Some(c) = fctx.collab.as_ref() else {
        return Vec::new();
    };
    let ptr = Arc::as_ptr(c) as *const ();
    COLLABS.with(|all| {
        all.borrow()
            .iter()
            .find(|d| Arc::as_ptr(d) as *const () == ptr)
            .map(|d| d.take_announcements())
            .unwrap_or_default()
    })
}

/// Value of `name` in the snapshot currently on disk.
pub fn saved_field(fctx: &FormCtx, name: &str) -> Option<SnapshotValue> {
    fctx.store.read().unwrap()?.fields.get(name).cloned()
}
