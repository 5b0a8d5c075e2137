// src/template/registry.rs

use crate::template::questionnaire::{
    FieldKind, FieldSpec, QuestionnaireTemplate, RuleSpec, SectionTemplate,
};
use std::collections::{BTreeMap, BTreeSet};

/// One schema field plus where it lives.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub spec: FieldSpec,
    pub group: String,
    /// 1-based rendered section; `None` for derived groups.
    pub section: Option<usize>,
}

/// Name-indexed view over a validated template.
///
/// Built once at startup and shared by the binder, rules, validator,
/// persistence and aggregation code.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    template: QuestionnaireTemplate,
    entries: Vec<FieldEntry>,
    index: BTreeMap<String, usize>,
    triggers: BTreeSet<String>,
    sentinels: BTreeSet<String>,
}

impl FieldRegistry {
    pub fn from_template(template: QuestionnaireTemplate) -> Self {
        let mut entries = Vec::new();

        for (i, s) in template.sections.iter().enumerate() {
            for f in s.fields.iter() {
                entries.push(FieldEntry {
                    spec: f.clone(),
                    group: s.name.clone(),
                    section: Some(i + 1),
                });
            }
        }
        for g in template.derived_groups.iter() {
            for f in g.fields.iter() {
                entries.push(FieldEntry {
                    spec: f.clone(),
                    group: g.name.clone(),
                    section: None,
                });
            }
        }

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.spec.name.clone(), i))
            .collect();

        let mut triggers = BTreeSet::new();
        let mut sentinels = BTreeSet::new();
        for r in template.rules.iter() {
            match r {
                RuleSpec::Visibility { trigger, .. } => {
                    triggers.insert(trigger.clone());
                }
                RuleSpec::Exclusive { sentinels: s } => {
                    sentinels.extend(s.iter().cloned());
                }
            }
        }

        Self {
            template,
            entries,
            index,
            triggers,
            sentinels,
        }
    }

    pub fn template(&self) -> &QuestionnaireTemplate {
        &self.template
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.index.get(name).and_then(|&i| self.entries.get(i))
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.get(name).map(|e| &e.spec)
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.get(name).map(|e| e.spec.kind)
    }

    /// All fields in schema order (sections, then derived groups).
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn field_count(&self) -> usize {
        self.entries.len()
    }

    pub fn section_count(&self) -> usize {
        self.template.section_count()
    }

    pub fn section(&self, n: usize) -> Option<&SectionTemplate> {
        self.template.section(n)
    }

    /// Group names in aggregation order.
    pub fn group_names(&self) -> Vec<&str> {
        self.template
            .sections
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.template.derived_groups.iter().map(|g| g.name.as_str()))
            .collect()
    }

    pub fn group_fields(&self, group: &str) -> impl Iterator<Item = &FieldEntry> + '_ {
        let group = group.to_string();
        self.entries.iter().filter(move |e| e.group == group)
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.template.rules
    }

    pub fn is_trigger(&self, name: &str) -> bool {
        self.triggers.contains(name)
    }

    pub fn is_sentinel(&self, value: &str) -> bool {
        self.sentinels.contains(value)
    }
}

// ======================================================
// Unit Tests
// ======================================================
