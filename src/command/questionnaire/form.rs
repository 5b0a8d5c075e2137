// src/command/questionnaire/form.rs

//! In-memory form: values, required flags, rule-hidden targets, row selection
//! and inline errors for every schema field.

use crate::template::questionnaire::{FieldKind, FieldSpec};
use crate::template::registry::FieldRegistry;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// single_choice: the checked option.
    Single(Option<String>),
    /// multi_choice: the checked options.
    Multi(BTreeSet<String>),
    /// rating / hidden / text.
    Raw(String),
}

impl FieldValue {
    pub fn empty_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::SingleChoice => FieldValue::Single(None),
            FieldKind::MultiChoice => FieldValue::Multi(BTreeSet::new()),
            FieldKind::Rating | FieldKind::Hidden | FieldKind::Text => {
                FieldValue::Raw(String::new())
            }
        }
    }

    pub fn is_checked(&self, value: &str) -> bool {
        match self {
            FieldValue::Single(v) => v.as_deref() == Some(value),
            FieldValue::Multi(set) => set.contains(value),
            FieldValue::Raw(_) => false,
        }
    }

    pub fn any_checked(&self) -> bool {
        match self {
            FieldValue::Single(v) => v.is_some(),
            FieldValue::Multi(set) => !set.is_empty(),
            FieldValue::Raw(_) => false,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            FieldValue::Raw(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    pub value: FieldValue,
    /// Effective required flag (schema default, overridden by rules).
    pub required: bool,
    /// Hidden by a visibility rule.
    pub hidden: bool,
    /// Rows / rating buttons rendered as selected.
    pub selected: BTreeSet<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormModel {
    fields: BTreeMap<String, FieldState>,
}

impl FormModel {
    pub fn new(registry: &FieldRegistry) -> Self {
        let fields = registry
            .entries()
            .iter()
            .map(|e| {
                (
                    e.spec.name.clone(),
                    FieldState {
                        value: FieldValue::empty_for(e.spec.kind),
                        required: e.spec.required,
                        hidden: false,
                        selected: BTreeSet::new(),
                        error: None,
                    },
                )
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.get_mut(name)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn is_checked(&self, name: &str, value: &str) -> bool {
        self.value(name).map(|v| v.is_checked(value)).unwrap_or(false)
    }

    pub fn single(&self, name: &str) -> Option<&str> {
        match self.value(name) {
            Some(FieldValue::Single(v)) => v.as_deref(),
            _ => None,
        }
    }

    pub fn raw(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(|v| v.raw())
    }

    /// Checked values in option order.
    pub fn checked_in_option_order(&self, spec: &FieldSpec) -> Vec<String> {
        spec.options
            .iter()
            .filter(|o| self.is_checked(&spec.name, &o.value))
            .map(|o| o.value.clone())
            .collect()
    }

    pub fn is_selected(&self, name: &str, value: &str) -> bool {
        self.fields
            .get(name)
            .map(|f| f.selected.contains(value))
            .unwrap_or(false)
    }

    /// Re-derive row / button selection from the current value.
    pub fn refresh_selection(&mut self, name: &str) {
        let Some(f) = self.fields.get_mut(name) else {
            return;
        };
        f.selected = match &f.value {
            FieldValue::Single(Some(v)) => std::iter::once(v.clone()).collect(),
            FieldValue::Single(None) => BTreeSet::new(),
            FieldValue::Multi(set) => set.clone(),
            FieldValue::Raw(s) if !s.is_empty() => std::iter::once(s.clone()).collect(),
            FieldValue::Raw(_) => BTreeSet::new(),
        };
    }

    /// Reset to the empty value for the field's kind.
    pub fn clear_value(&mut self, name: &str) {
        if let Some(f) = self.fields.get_mut(name) {
            let kind = match f.value {
                FieldValue::Single(_) => FieldKind::SingleChoice,
                FieldValue::Multi(_) => FieldKind::MultiChoice,
                FieldValue::Raw(_) => FieldKind::Text,
            };
            f.value = FieldValue::empty_for(kind);
            f.selected.clear();
        }
    }

    pub fn set_error(&mut self, name: &str, msg: impl Into<String>) {
        if let Some(f) = self.fields.get_mut(name) {
            f.error = Some(msg.into());
        }
    }

    pub fn clear_error(&mut self, name: &str) {
        if let Some(f) = self.fields.get_mut(name) {
            f.error = None;
        }
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|f| f.error.as_deref())
    }

    pub fn error_count(&self) -> usize {
        self.fields.values().filter(|f| f.error.is_some()).count()
    }
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::questionnaire::builtin_template;

    fn model() -> FormModel {
        FormModel::new(&FieldRegistry::from_template(builtin_template().unwrap()))
    }

    #[test]
    fn new_model_starts_empty_with_schema_required_flags() {
        let m = model();
        assert_eq!(m.value("contact_004"), Some(&FieldValue::Single(None)));
        assert_eq!(m.value("care_002"), Some(&FieldValue::Multi(BTreeSet::new())));
        assert_eq!(m.raw("care_005_eating"), Some(""));
        assert!(m.get("contact_001").unwrap().required);
        assert!(!m.get("contact_003").unwrap().required);
    }

    #[test]
    fn refresh_selection_mirrors_value() {
        let mut m = model();
        m.get_mut("care_002").unwrap().value =
            FieldValue::Multi(["diabetes".to_string(), "heart".to_string()].into());
        assert!(!m.is_selected("care_002", "diabetes"));

        m.refresh_selection("care_002");
        assert!(m.is_selected("care_002", "diabetes"));
        assert!(m.is_selected("care_002", "heart"));

        m.clear_value("care_002");
        assert!(!m.is_selected("care_002", "heart"));
        assert_eq!(m.value("care_002"), Some(&FieldValue::Multi(BTreeSet::new())));
    }
}
