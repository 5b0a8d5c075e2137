// src/command/questionnaire/validate.rs

use crate::collab::Collaborator;
use crate::command::questionnaire::form::{FieldState, FieldValue};
use crate::command::questionnaire::types::{FormCtx, QuestionnaireState};
use crate::template::questionnaire::{FieldKind, FieldSpec, TextFormat};

pub const MSG_SELECT_OPTION: &str = "Please select an option";
pub const MSG_SELECT_AT_LEAST_ONE: &str = "Please select at least one option";
pub const MSG_MAKE_SELECTION: &str = "Please make a selection";
pub const MSG_REQUIRED: &str = "This field is required";
pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address";

/// Check one field's current state against its kind. Hidden or optional fields pass.
fn check_field(
    spec: &FieldSpec,
    st: &FieldState,
    collab: Option<&dyn Collaborator>,
) -> Result<(), &'static str> {
    if st.hidden || !st.required {
        return Ok(());
    }

    match (spec.kind, &st.value) {
        (FieldKind::SingleChoice, v) => {
            if !v.any_checked() {
                return Err(MSG_SELECT_OPTION);
            }
        }
        (FieldKind::MultiChoice, v) => {
            if !v.any_checked() {
                return Err(MSG_SELECT_AT_LEAST_ONE);
            }
        }
        (FieldKind::Rating | FieldKind::Hidden, v) => {
            if v.raw().map(|s| s.is_empty()).unwrap_or(true) {
                return Err(MSG_MAKE_SELECTION);
            }
        }
        (FieldKind::Text, FieldValue::Raw(s)) => {
            if s.trim().is_empty() {
                return Err(MSG_REQUIRED);
            }
            if spec.format == Some(TextFormat::Email) {
                if let Some(c) = collab {
                    if !c.validate_email(s) {
                        return Err(MSG_INVALID_EMAIL);
                    }
                }
            }
        }
        (FieldKind::Text, _) => return Err(MSG_REQUIRED),
    }

    Ok(())
}

/// Validate section `n` (1-based), replacing its inline errors.
///
/// Every failing field gets exactly one error; nothing short-circuits.
/// Unknown sections are logged and fail.
pub fn validate_section(state: &mut QuestionnaireState, fctx: &FormCtx, n: usize) -> bool {
    let Some(section) = state.registry.section(n) else {
        tracing::warn!(section = n, "section not found; validation failed");
        return false;
    };

    for f in section.fields.iter() {
        state.model.clear_error(&f.name);
    }

    let collab = fctx.collab.as_deref();
    let mut failed = 0usize;
    for spec in section.fields.iter() {
        let verdict = state
            .model
            .get(&spec.name)
            .map(|st| check_field(spec, st, collab));
        if let Some(Err(msg)) = verdict {
            state.model.set_error(&spec.name, msg);
            failed += 1;
        }
    }

    if failed > 0 {
        tracing::debug!(section = n, failed, "section invalid");
    }
    failed == 0
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::questionnaire::binder::{click_option_row, click_rating, set_text};
    use crate::command::questionnaire::test_support::{fresh, fresh_without_collab};

    #[test]
    fn empty_required_single_choice_gets_exactly_one_error() {
        let (_td, mut state, fctx) = fresh();
        set_text(&mut state, &fctx, "contact_001", "Jane").unwrap();
        set_text(&mut state, &fctx, "contact_002", "jane@example.com").unwrap();
        set_text(&mut state, &fctx, "contact_005", "Mum").unwrap();

        assert!(!validate_section(&mut state, &fctx, 1));
        assert_eq!(state.model.error("contact_004"), Some(MSG_SELECT_OPTION));
        assert_eq!(state.model.error_count(), 1);
    }

    #[test]
    fn all_failures_reported_without_short_circuit() {
        let (_td, mut state, fctx) = fresh();
        assert!(!validate_section(&mut state, &fctx, 4));

        assert_eq!(state.model.error("care_001"), Some(MSG_SELECT_OPTION));
        assert_eq!(state.model.error("care_002"), Some(MSG_SELECT_AT_LEAST_ONE));
        assert_eq!(state.model.error("care_005_bathing"), Some(MSG_MAKE_SELECTION));
        assert_eq!(state.model.error("care_005_medication"), Some(MSG_MAKE_SELECTION));
        assert!(state.model.error("care_004").is_none());
        assert!(state.model.error("care_006").is_none());
    }

    #[test]
    fn revalidation_clears_previous_errors() {
        let (_td, mut state, fctx) = fresh();
        assert!(!validate_section(&mut state, &fctx, 3));
        let before = state.model.error_count();
        assert!(!validate_section(&mut state, &fctx, 3));
        assert_eq!(state.model.error_count(), before);

        click_option_row(&mut state, &fctx, "budget_001", "under_800").unwrap();
        click_option_row(&mut state, &fctx, "budget_002", "mixed").unwrap();
        click_rating(&mut state, &fctx, "budget_003", "4").unwrap();
        assert!(validate_section(&mut state, &fctx, 3));
        assert_eq!(state.model.error_count(), 0);
    }

    #[test]
    fn whitespace_text_is_missing() {
        let (_td, mut state, fctx) = fresh();
        set_text(&mut state, &fctx, "contact_001", "   ").unwrap();
        validate_section(&mut state, &fctx, 1);
        assert_eq!(state.model.error("contact_001"), Some(MSG_REQUIRED));
    }

    #[test]
    fn malformed_email_flagged_with_collaborator() {
        let (_td, mut state, fctx) = fresh();
        set_text(&mut state, &fctx, "contact_002", "not-an-email").unwrap();
        validate_section(&mut state, &fctx, 1);
        assert_eq!(state.model.error("contact_002"), Some(MSG_INVALID_EMAIL));

        set_text(&mut state, &fctx, "contact_002", "").unwrap();
        validate_section(&mut state, &fctx, 1);
        assert_eq!(state.model.error("contact_002"), Some(MSG_REQUIRED));
    }

    #[test]
    fn email_format_skipped_without_collaborator() {
        let (_td, mut state, fctx) = fresh_without_collab();
        set_text(&mut state, &fctx, "contact_002", "not-an-email").unwrap();
        validate_section(&mut state, &fctx, 1);
        assert!(state.model.error("contact_002").is_none());
    }

    #[test]
    fn unknown_section_fails() {
        let (_td, mut state, fctx) = fresh();
        assert!(!validate_section(&mut state, &fctx, 0));
        assert!(!validate_section(&mut state, &fctx, 42));
    }
}
