// src/command/questionnaire/persist.rs

use crate::command::questionnaire::form::FieldValue;
use crate::command::questionnaire::nav::{render, update_progress};
use crate::command::questionnaire::rules::apply_visibility_rules;
use crate::command::questionnaire::types::{FormCtx, QuestionnaireError, QuestionnaireState};
use crate::snapshot_store::{Snapshot, SnapshotValue};
use crate::template::questionnaire::FieldKind;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Serialize the form the way a browser serializes it: text, rating and hidden
/// fields always, a single choice only when checked, a multi choice as a list
/// when anything is checked.
pub fn to_snapshot(state: &QuestionnaireState, now: DateTime<Utc>) -> Snapshot {
    let mut fields = BTreeMap::new();

    for e in state.registry.entries() {
        let name = &e.spec.name;
        let Some(value) = state.model.value(name) else {
            continue;
        };
        let saved = match value {
            FieldValue::Raw(s) => Some(SnapshotValue::One(s.clone())),
            FieldValue::Single(v) => v.clone().map(SnapshotValue::One),
            FieldValue::Multi(set) if !set.is_empty() => Some(SnapshotValue::Many(
                state.model.checked_in_option_order(&e.spec),
            )),
            FieldValue::Multi(_) => None,
        };
        if let Some(v) = saved {
            fields.insert(name.clone(), v);
        }
    }

    Snapshot {
        fields,
        current_section: state.nav.current_section,
        timestamp: now,
    }
}

pub fn save(state: &QuestionnaireState, fctx: &FormCtx) -> Result<(), QuestionnaireError> {
    fctx.store.write(&to_snapshot(state, Utc::now()))?;
    Ok(())
}

/// Write-through save; failures are logged and otherwise ignored.
pub fn save_best_effort(state: &QuestionnaireState, fctx: &FormCtx) {
    if let Err(e) = save(state, fctx) {
        tracing::warn!(error = %e, "saving progress failed");
    }
}

/// Restore a fresh snapshot, if any. Returns `true` when something was restored.
///
/// Rules, rendering and progress are refreshed either way.
pub fn load(state: &mut QuestionnaireState, fctx: &FormCtx, now: DateTime<Utc>) -> bool {
    let restored = match fctx.store.load_fresh(now) {
        Some(snap) => {
            apply_snapshot(state, &snap);
            tracing::info!(
                section = state.nav.current_section,
                saved_at = %snap.timestamp,
                "form data restored"
            );
            true
        }
        None => false,
    };

    apply_visibility_rules(state);
    let n = state.nav.current_section;
    if let Err(e) = render(state, n) {
        tracing::warn!(error = %e, "render after restore failed");
    }
    update_progress(state);

    restored
}

/// Apply snapshot values by field kind. Unknown keys and values a field does not
/// offer are skipped.
pub fn apply_snapshot(state: &mut QuestionnaireState, snap: &Snapshot) {
    let total = state.nav.total_sections.max(1);
    state.nav.current_section = snap.current_section.clamp(1, total);

    for (name, saved) in snap.fields.iter() {
        let Some(spec) = state.registry.spec(name) else {
            tracing::debug!(field = %name, "saved field not in schema; skipped");
            continue;
        };
        let Some(st) = state.model.get_mut(name) else {
            continue;
        };

        match (spec.kind, saved) {
            (FieldKind::SingleChoice, SnapshotValue::One(v)) => {
                if spec.accepts(v) {
                    st.value = FieldValue::Single(Some(v.clone()));
                }
            }
            (FieldKind::MultiChoice, SnapshotValue::Many(vs)) => {
                if let FieldValue::Multi(set) = &mut st.value {
                    set.extend(vs.iter().filter(|v| spec.accepts(v)).cloned());
                }
            }
            (FieldKind::MultiChoice, SnapshotValue::One(v)) => {
                if let FieldValue::Multi(set) = &mut st.value {
                    if spec.accepts(v) {
                        set.insert(v.clone());
                    }
                }
            }
            (FieldKind::Rating, SnapshotValue::One(v)) => {
                if v.is_empty() || spec.accepts(v) {
                    st.value = FieldValue::Raw(v.clone());
                }
            }
            (FieldKind::Hidden | FieldKind::Text, SnapshotValue::One(v)) => {
                st.value = FieldValue::Raw(v.clone());
            }
            (kind, _) => {
                tracing::debug!(field = %name, ?kind, "saved value shape does not match field; skipped");
                continue;
            }
        }

        // Only rows and rating buttons carry a selected state.
        if matches!(
            spec.kind,
            FieldKind::SingleChoice | FieldKind::MultiChoice | FieldKind::Rating
        ) {
            state.model.refresh_selection(name);
        }
    }
}

/// Delete the snapshot. Only called after a confirmed submission.
pub fn clear(fctx: &FormCtx) -> Result<(), QuestionnaireError> {
    fctx.store.remove()?;
    Ok(())
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::questionnaire::binder::{click_option_row, click_rating, set_text};
    use crate::command::questionnaire::test_support::{fresh, fresh_in};
    use chrono::Duration;

    #[test]
    fn snapshot_follows_form_serialization_rules() {
        let (_td, mut state, fctx) = fresh();
        click_option_row(&mut state, &fctx, "location_003", "suburban").unwrap();
        click_option_row(&mut state, &fctx, "location_003", "coastal").unwrap();

        let snap = to_snapshot(&state, Utc::now());
        assert_eq!(snap.fields.get("contact_001"), Some(&SnapshotValue::One(String::new())));
        assert_eq!(snap.fields.get("care_005_eating"), Some(&SnapshotValue::One(String::new())));
        assert!(!snap.fields.contains_key("contact_004"));
        assert!(!snap.fields.contains_key("care_002"));
        assert_eq!(
            snap.fields.get("location_003"),
            Some(&SnapshotValue::Many(vec!["suburban".into(), "coastal".into()]))
        );
        assert_eq!(snap.current_section, 1);
    }

    #[test]
    fn unchanged_state_saves_differ_only_in_timestamp() {
        let (_td, mut state, fctx) = fresh();
        click_option_row(&mut state, &fctx, "contact_004", "friend").unwrap();

        let t0 = Utc::now();
        let a = to_snapshot(&state, t0);
        let b = to_snapshot(&state, t0 + Duration::seconds(30));
        assert_ne!(a.timestamp, b.timestamp);
        assert_eq!(a.fields, b.fields);
        assert_eq!(a.current_section, b.current_section);
    }

    #[test]
    fn restore_applies_values_by_kind() {
        let td = tempfile::tempdir().unwrap();
        {
            let (mut state, fctx) = fresh_in(td.path());
            click_option_row(&mut state, &fctx, "contact_004", "spouse").unwrap();
            set_text(&mut state, &fctx, "contact_005", "Alex").unwrap();
            click_option_row(&mut state, &fctx, "care_002", "diabetes").unwrap();
            click_rating(&mut state, &fctx, "care_005_toilet", "2").unwrap();
            state.nav.current_section = 5;
            save(&state, &fctx).unwrap();
        }

        let (state, _fctx) = fresh_in(td.path());
        assert_eq!(state.current_section(), 5);
        assert_eq!(state.view.visible_sections(), vec![5]);
        assert_eq!(state.model.single("contact_004"), Some("spouse"));
        assert!(state.model.is_selected("contact_004", "spouse"));
        assert_eq!(state.model.raw("contact_005"), Some("Alex"));
        assert!(state.model.get("contact_005").unwrap().selected.is_empty());
        assert!(state.model.is_checked("care_002", "diabetes"));
        assert_eq!(state.model.raw("care_005_toilet"), Some("2"));
        assert!(state.model.is_selected("care_005_toilet", "2"));
    }

    #[test]
    fn out_of_range_section_is_clamped() {
        let (_td, mut state, _fctx) = fresh();
        let mut snap = to_snapshot(&state, Utc::now());
        snap.current_section = 99;
        apply_snapshot(&mut state, &snap);
        assert_eq!(state.current_section(), 8);

        snap.current_section = 0;
        apply_snapshot(&mut state, &snap);
        assert_eq!(state.current_section(), 1);
    }

    #[test]
    fn unknown_keys_and_bad_values_skipped() {
        let (_td, mut state, _fctx) = fresh();
        let mut snap = to_snapshot(&state, Utc::now());
        snap.fields
            .insert("legacy_field".into(), SnapshotValue::One("x".into()));
        snap.fields
            .insert("contact_004".into(), SnapshotValue::One("cousin".into()));
        snap.fields
            .insert("care_005_eating".into(), SnapshotValue::Many(vec!["3".into()]));

        apply_snapshot(&mut state, &snap);
        assert_eq!(state.model.single("contact_004"), None);
        assert_eq!(state.model.raw("care_005_eating"), Some(""));
    }

    #[test]
    fn clear_removes_snapshot() {
        let (_td, mut state, fctx) = fresh();
        set_text(&mut state, &fctx, "contact_001", "Jane").unwrap();
        assert!(fctx.store.exists());
        clear(&fctx).unwrap();
        assert!(!fctx.store.exists());
    }
}
