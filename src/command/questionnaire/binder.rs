// src/command/questionnaire/binder.rs

//! User interaction handlers. Every value change is persisted immediately.

use crate::command::questionnaire::form::FieldValue;
use crate::command::questionnaire::persist::save_best_effort;
use crate::command::questionnaire::rules::{apply_exclusive, apply_visibility_rules};
use crate::command::questionnaire::types::{FormCtx, QuestionnaireError, QuestionnaireState};
use crate::template::questionnaire::{FieldKind, FieldSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingKey {
    Enter,
    ArrowLeft,
    ArrowRight,
}

fn lookup(state: &QuestionnaireState, name: &str) -> Result<FieldSpec, QuestionnaireError> {
    match state.registry.spec(name) {
        Some(spec) => Ok(spec.clone()),
        None => {
            tracing::warn!(field = name, "field not found; interaction ignored");
            Err(QuestionnaireError::UnknownField(name.to_string()))
        }
    }
}

fn ensure_accepts(spec: &FieldSpec, value: &str) -> Result<(), QuestionnaireError> {
    if spec.accepts(value) {
        return Ok(());
    }
    tracing::warn!(field = %spec.name, value, "value not offered by field; ignored");
    Err(QuestionnaireError::InvalidValue {
        field: spec.name.clone(),
        value: value.to_string(),
    })
}

fn after_single_change(state: &mut QuestionnaireState, name: &str) {
    state.model.refresh_selection(name);
    if state.registry.is_trigger(name) {
        apply_visibility_rules(state);
    }
}

/// Click on an option row (the label area around a radio or checkbox).
pub fn click_option_row(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    name: &str,
    value: &str,
) -> Result<(), QuestionnaireError> {
    let spec = lookup(state, name)?;
    ensure_accepts(&spec, value)?;

    match spec.kind {
        FieldKind::SingleChoice => {
            if let Some(st) = state.model.get_mut(name) {
                st.value = FieldValue::Single(Some(value.to_string()));
            }
            after_single_change(state, name);
            save_best_effort(state, fctx);

            let label = spec.option_label(value).unwrap_or(value);
            fctx.announce(&format!("Selected: {label}"));
        }
        FieldKind::MultiChoice => {
            if let Some(st) = state.model.get_mut(name) {
                if let FieldValue::Multi(set) = &mut st.value {
                    if !set.remove(value) {
                        set.insert(value.to_string());
                    }
                }
            }
            state.model.refresh_selection(name);
            apply_exclusive(state, name, value);
            save_best_effort(state, fctx);
        }
        _ => {
            return Err(QuestionnaireError::KindMismatch {
                field: name.to_string(),
                expected: "choice",
            })
        }
    }

    Ok(())
}

/// Direct change of a radio or checkbox input.
pub fn change_input(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    name: &str,
    value: &str,
    checked: bool,
) -> Result<(), QuestionnaireError> {
    let spec = lookup(state, name)?;
    ensure_accepts(&spec, value)?;

    match spec.kind {
        FieldKind::SingleChoice => {
            if let Some(st) = state.model.get_mut(name) {
                if checked {
                    st.value = FieldValue::Single(Some(value.to_string()));
                } else if st.value.is_checked(value) {
                    st.value = FieldValue::Single(None);
                }
            }
            after_single_change(state, name);
        }
        FieldKind::MultiChoice => {
            if let Some(st) = state.model.get_mut(name) {
                if let FieldValue::Multi(set) = &mut st.value {
                    if checked {
                        set.insert(value.to_string());
                    } else {
                        set.remove(value);
                    }
                }
            }
            state.model.refresh_selection(name);
            apply_exclusive(state, name, value);
        }
        _ => {
            return Err(QuestionnaireError::KindMismatch {
                field: name.to_string(),
                expected: "choice",
            })
        }
    }

    save_best_effort(state, fctx);
    Ok(())
}

/// Select rating `value` for `name`; siblings are deselected.
pub fn click_rating(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    name: &str,
    value: &str,
) -> Result<(), QuestionnaireError> {
    let spec = lookup(state, name)?;
    if spec.kind != FieldKind::Rating {
        return Err(QuestionnaireError::KindMismatch {
            field: name.to_string(),
            expected: "rating",
        });
    }
    ensure_accepts(&spec, value)?;

    if let Some(st) = state.model.get_mut(name) {
        st.value = FieldValue::Raw(value.to_string());
    }
    state.model.refresh_selection(name);

    fctx.announce(&format!("Selected rating: {value}"));
    save_best_effort(state, fctx);
    Ok(())
}

/// Keyboard on a focused rating button.
///
/// Enter selects the focused button; arrows move focus with wrap-around.
/// Returns the index that should hold focus afterwards.
pub fn rating_key(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    name: &str,
    focused: usize,
    key: RatingKey,
) -> Result<usize, QuestionnaireError> {
    let spec = lookup(state, name)?;
    let values = spec.rating_values();
    if spec.kind != FieldKind::Rating || values.is_empty() {
        return Err(QuestionnaireError::KindMismatch {
            field: name.to_string(),
            expected: "rating",
        });
    }

    let n = values.len();
    let focused = focused.min(n - 1);

    match key {
        RatingKey::Enter => {
            click_rating(state, fctx, name, &values[focused])?;
            Ok(focused)
        }
        RatingKey::ArrowLeft => Ok((focused + n - 1) % n),
        RatingKey::ArrowRight => Ok((focused + 1) % n),
    }
}

/// Free-text (or email) input.
pub fn set_text(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    name: &str,
    text: &str,
) -> Result<(), QuestionnaireError> {
    let spec = lookup(state, name)?;
    if spec.kind != FieldKind::Text {
        return Err(QuestionnaireError::KindMismatch {
            field: name.to_string(),
            expected: "text",
        });
    }

    if let Some(st) = state.model.get_mut(name) {
        st.value = FieldValue::Raw(text.to_string());
    }
    save_best_effort(state, fctx);
    Ok(())
}

// ======================================================
// Unit Tests
// ======================================================
