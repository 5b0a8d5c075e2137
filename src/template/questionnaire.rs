// src/template/questionnaire.rs

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Bundled questionnaire definition.
pub const BUILTIN_SCHEMA: &str = include_str!("../../assets/questionnaire.json5");

/// Top-level JSON5 questionnaire definition.
///
/// Rendered `sections` are shown one at a time; `derived_groups` never render
/// but take part in aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionnaireTemplate {
    pub schema_id: String,
    pub version: String,
    pub reference_prefix: String,

    /// 1-based section that raises the one-time halfway notice.
    #[serde(default)]
    pub milestone_section: Option<usize>,

    pub sections: Vec<SectionTemplate>,

    #[serde(default)]
    pub derived_groups: Vec<DerivedGroup>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionTemplate {
    pub name: String,
    pub title: String,
    pub motivation: Motivation,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Motivation {
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivedGroup {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Text fields only.
    #[serde(default)]
    pub format: Option<TextFormat>,

    /// Choice fields only, in display order.
    #[serde(default)]
    pub options: Vec<OptionSpec>,

    /// Rating fields only; values are "1"..="scale".
    #[serde(default)]
    pub scale: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    SingleChoice,
    MultiChoice,
    Rating,
    Text,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionSpec {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Toggle `target` depending on whether `trigger` currently equals `sentinel`.
    Visibility {
        trigger: String,
        sentinel: String,
        target: String,
        when_match: WhenMatch,
    },
    /// In any multi-choice group, a sentinel value excludes every other value.
    Exclusive { sentinels: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhenMatch {
    Hide,
    Show,
}

impl FieldSpec {
    pub fn is_choice(&self) -> bool {
        matches!(self.kind, FieldKind::SingleChoice | FieldKind::MultiChoice)
    }

    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    pub fn rating_values(&self) -> Vec<String> {
        let n = self.scale.unwrap_or(0);
        (1..=n).map(|v| v.to_string()).collect()
    }

    /// Whether `value` is one of the values this field can hold when checked/selected.
    pub fn accepts(&self, value: &str) -> bool {
        match self.kind {
            FieldKind::SingleChoice | FieldKind::MultiChoice => {
                self.options.iter().any(|o| o.value == value)
            }
            FieldKind::Rating => value
                .parse::<u8>()
                .map(|v| v >= 1 && v <= self.scale.unwrap_or(0))
                .unwrap_or(false),
            FieldKind::Text | FieldKind::Hidden => true,
        }
    }
}

impl QuestionnaireTemplate {
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// 1-based lookup.
    pub fn section(&self, n: usize) -> Option<&SectionTemplate> {
        n.checked_sub(1).and_then(|i| self.sections.get(i))
    }
}

#[derive(Debug)]
pub enum TemplateLoadError {
    Io(std::io::Error),
    Parse(json5::Error),
    Validation(String),
}

impl std::fmt::Display for TemplateLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateLoadError::Io(e) => write!(f, "I/O error: {e}"),
            TemplateLoadError::Parse(e) => write!(f, "Schema parse error: {e}"),
            TemplateLoadError::Validation(msg) => write!(f, "Schema validation error: {msg}"),
        }
    }
}

impl std::error::Error for TemplateLoadError {}

impl From<std::io::Error> for TemplateLoadError {
    fn from(e: std::io::Error) -> Self {
        TemplateLoadError::Io(e)
    }
}

impl From<json5::Error> for TemplateLoadError {
    fn from(e: json5::Error) -> Self {
        TemplateLoadError::Parse(e)
    }
}

/// Parse a JSON5 questionnaire string.
pub fn parse_template_str(s: &str) -> Result<QuestionnaireTemplate, TemplateLoadError> {
    let tpl: QuestionnaireTemplate = json5::from_str(s)?;
    validate_template(&tpl)?;
    Ok(tpl)
}

/// Load a JSON5 questionnaire from disk.
pub fn load_template_path(
    path: impl AsRef<Path>,
) -> Result<QuestionnaireTemplate, TemplateLoadError> {
    let s = fs::read_to_string(path)?;
    parse_template_str(&s)
}

pub fn builtin_template() -> Result<QuestionnaireTemplate, TemplateLoadError> {
    parse_template_str(BUILTIN_SCHEMA)
}

fn invalid(msg: impl Into<String>) -> TemplateLoadError {
    TemplateLoadError::Validation(msg.into())
}

/// Structural validation: unique names, per-kind attributes, rule references.
pub fn validate_template(tpl: &QuestionnaireTemplate) -> Result<(), TemplateLoadError> {
    if tpl.sections.is_empty() {
        return Err(invalid("questionnaire must contain at least one section"));
    }
    if tpl.version.trim().is_empty() {
        return Err(invalid("version must not be empty"));
    }
    if tpl.reference_prefix.trim().is_empty() {
        return Err(invalid("reference_prefix must not be empty"));
    }

    if let Some(m) = tpl.milestone_section {
        if m == 0 || m > tpl.sections.len() {
            return Err(invalid(format!(
                "milestone_section {m} out of range 1..={}",
                tpl.sections.len()
            )));
        }
    }

    let mut group_names = BTreeSet::new();
    let mut field_names = BTreeSet::new();

    for s in tpl.sections.iter() {
        if s.name.trim().is_empty() {
            return Err(invalid("section name must not be empty"));
        }
        if !group_names.insert(s.name.as_str()) {
            return Err(invalid(format!("duplicate group name '{}'", s.name)));
        }
        for f in s.fields.iter() {
            validate_field(f)?;
            if !field_names.insert(f.name.as_str()) {
                return Err(invalid(format!("duplicate field name '{}'", f.name)));
            }
        }
    }

    for g in tpl.derived_groups.iter() {
        if !group_names.insert(g.name.as_str()) {
            return Err(invalid(format!("duplicate group name '{}'", g.name)));
        }
        for f in g.fields.iter() {
            validate_field(f)?;
            if f.kind != FieldKind::Hidden {
                return Err(invalid(format!(
                    "derived field '{}' must be of kind hidden",
                    f.name
                )));
            }
            if !field_names.insert(f.name.as_str()) {
                return Err(invalid(format!("duplicate field name '{}'", f.name)));
            }
        }
    }

    for r in tpl.rules.iter() {
        match r {
            RuleSpec::Visibility {
                trigger,
                sentinel,
                target,
                ..
            } => {
                let trig = find_rendered_field(tpl, trigger).ok_or_else(|| {
                    invalid(format!("rule trigger '{trigger}' is not a rendered field"))
                })?;
                if trig.kind != FieldKind::SingleChoice {
                    return Err(invalid(format!(
                        "rule trigger '{trigger}' must be single_choice"
                    )));
                }
                if !trig.accepts(sentinel) {
                    return Err(invalid(format!(
                        "rule sentinel '{sentinel}' is not an option of '{trigger}'"
                    )));
                }
                if find_rendered_field(tpl, target).is_none() {
                    return Err(invalid(format!(
                        "rule target '{target}' is not a rendered field"
                    )));
                }
                if target == trigger {
                    return Err(invalid(format!("rule on '{trigger}' targets itself")));
                }
            }
            RuleSpec::Exclusive { sentinels } => {
                if sentinels.is_empty() || sentinels.iter().any(|s| s.trim().is_empty()) {
                    return Err(invalid("exclusive rule needs non-empty sentinels"));
                }
            }
        }
    }

    Ok(())
}

fn find_rendered_field<'a>(tpl: &'a QuestionnaireTemplate, name: &str) -> Option<&'a FieldSpec> {
    tpl.sections
        .iter()
        .flat_map(|s| s.fields.iter())
        .find(|f| f.name == name)
}

fn validate_field(f: &FieldSpec) -> Result<(), TemplateLoadError> {
    if f.name.trim().is_empty() {
        return Err(invalid("field name must not be empty"));
    }
    if f.name == "currentSection" || f.name == "timestamp" {
        return Err(invalid(format!("field name '{}' is reserved", f.name)));
    }

    match f.kind {
        FieldKind::SingleChoice | FieldKind::MultiChoice => {
            if f.options.is_empty() {
                return Err(invalid(format!("choice field '{}' has no options", f.name)));
            }
            let mut seen = BTreeSet::new();
            for o in f.options.iter() {
                if o.value.trim().is_empty() {
                    return Err(invalid(format!("field '{}' has an empty option value", f.name)));
                }
                if !seen.insert(o.value.as_str()) {
                    return Err(invalid(format!(
                        "field '{}' repeats option '{}'",
                        f.name, o.value
                    )));
                }
            }
        }
        FieldKind::Rating => match f.scale {
            Some(n) if n >= 2 => {}
            _ => {
                return Err(invalid(format!(
                    "rating field '{}' needs a scale of at least 2",
                    f.name
                )))
            }
        },
        FieldKind::Text | FieldKind::Hidden => {}
    }

    if f.format.is_some() && f.kind != FieldKind::Text {
        return Err(invalid(format!("format on non-text field '{}'", f.name)));
    }
    if !f.options.is_empty() && !f.is_choice() {
        return Err(invalid(format!("options on non-choice field '{}'", f.name)));
    }

    Ok(())
}

// ======================================================
// Unit Tests
// ======================================================
