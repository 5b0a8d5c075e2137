// src/command/questionnaire/aggregate.rs

use crate::command::questionnaire::form::FieldValue;
use crate::command::questionnaire::types::QuestionnaireState;
use crate::template::questionnaire::FieldKind;

use chrono::{DateTime, Utc};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

pub const STATISTICS_KEY: &str = "_statistics";

/// Whole minutes since `started_at`, rounded to nearest.
pub fn duration_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = now.signed_duration_since(started_at).num_milliseconds().max(0);
    (ms as f64 / 60_000.0).round() as i64
}

pub fn completion_rate(filled: usize, total: usize) -> u64 {
    if total == 0 {
        return 0;
    }
    (filled as f64 / total as f64 * 100.0).round() as u64
}

/// Build `{ <group>: { <field>: value|null, .. }, .., "_statistics": {..} }`
/// from the live form, in schema order.
pub fn collect_all_form_data(
    state: &QuestionnaireState,
    now: DateTime<Utc>,
) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    let mut total = 0usize;
    let mut filled = 0usize;

    for group in state.registry.group_names() {
        let mut fields = JsonMap::new();

        for e in state.registry.group_fields(group) {
            total += 1;
            let v = match (e.spec.kind, state.model.value(&e.spec.name)) {
                (_, None) => JsonValue::Null,
                (FieldKind::SingleChoice, Some(FieldValue::Single(v))) => {
                    v.clone().map(JsonValue::String).unwrap_or(JsonValue::Null)
                }
                (FieldKind::MultiChoice, Some(FieldValue::Multi(_))) => {
                    let checked = state.model.checked_in_option_order(&e.spec);
                    if checked.is_empty() {
                        JsonValue::Null
                    } else {
                        json!(checked)
                    }
                }
                (FieldKind::Rating | FieldKind::Hidden, Some(FieldValue::Raw(s))) => {
                    if s.is_empty() {
                        JsonValue::Null
                    } else {
                        JsonValue::String(s.clone())
                    }
                }
                (FieldKind::Text, Some(FieldValue::Raw(s))) => {
                    let t = s.trim();
                    if t.is_empty() {
                        JsonValue::Null
                    } else {
                        JsonValue::String(t.to_string())
                    }
                }
                _ => JsonValue::Null,
            };

            if !v.is_null() {
                filled += 1;
            }
            fields.insert(e.spec.name.clone(), v);
        }

        out.insert(group.to_string(), JsonValue::Object(fields));
    }

    let rate = completion_rate(filled, total);
    let minutes = duration_minutes(state.started_at, now);

    out.insert(
        STATISTICS_KEY.to_string(),
        json!({
            "total_fields": total,
            "filled_fields": filled,
            "completion_rate": rate,
            "sections_completed": state.nav.total_sections,
            "form_duration_minutes": minutes,
        }),
    );

    tracing::info!(
        total_fields = total,
        filled_fields = filled,
        completion_rate = rate,
        form_duration_minutes = minutes,
        "data collection summary"
    );

    out
}

// ======================================================
// Unit Tests
// ======================================================
