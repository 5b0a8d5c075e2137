// src/command/questionnaire/rules.rs

//! Declarative conditional rules, evaluated uniformly from the schema's rule table.

use crate::command::questionnaire::form::FieldValue;
use crate::command::questionnaire::types::QuestionnaireState;
use crate::template::questionnaire::{FieldKind, RuleSpec, WhenMatch};

/// Evaluate every visibility rule against the current trigger values.
///
/// A target switched off is hidden, cleared and no longer required; a target
/// switched on is shown and required. Returns the targets now hidden.
pub fn apply_visibility_rules(state: &mut QuestionnaireState) -> Vec<String> {
    let mut hidden = Vec::new();

    for rule in state.registry.rules() {
        let RuleSpec::Visibility {
            trigger,
            sentinel,
            target,
            when_match,
        } = rule
        else {
            continue;
        };

        let matches = state.model.single(trigger) == Some(sentinel.as_str());
        let show = match when_match {
            WhenMatch::Hide => !matches,
            WhenMatch::Show => matches,
        };

        let Some(st) = state.model.get_mut(target) else {
            tracing::warn!(%target, "rule target not found");
            continue;
        };

        st.hidden = !show;
        st.required = show;

        if !show {
            st.error = None;
            state.model.clear_value(target);
            hidden.push(target.clone());
        }
    }

    hidden
}

/// Enforce sentinel exclusivity in multi-choice group `name` after `value` changed.
///
/// A checked sentinel unchecks everything else in the group; any other value
/// unchecks the group's sentinels.
pub fn apply_exclusive(state: &mut QuestionnaireState, name: &str, value: &str) {
    if state.registry.kind(name) != Some(FieldKind::MultiChoice) {
        return;
    }

    let is_sentinel = state.registry.is_sentinel(value);
    let registry = &state.registry;

    let Some(st) = state.model.get_mut(name) else {
        return;
    };
    let FieldValue::Multi(set) = &mut st.value else {
        return;
    };

    if is_sentinel {
        if set.contains(value) {
            set.retain(|v| v == value);
        }
    } else {
        set.retain(|v| !registry.is_sentinel(v));
    }

    state.model.refresh_selection(name);
}

// ======================================================
// Unit Tests
// ======================================================
