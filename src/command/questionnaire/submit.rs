// src/command/questionnaire/submit.rs

//! Final submission: build the envelope, hand it to a backend, then either
//! clear local progress and redirect or surface the failure.

use crate::backend::{SubmissionBackend, SubmissionResponse};
use crate::command::questionnaire::aggregate::{
    collect_all_form_data, completion_rate, duration_minutes, STATISTICS_KEY,
};
use crate::command::questionnaire::persist;
use crate::command::questionnaire::types::{FormCtx, QuestionnaireState};
use crate::command::questionnaire::validate::validate_section;
use crate::confirmation::{generate_reference, ConfirmationTarget};
use crate::error::{AppError, UserMsgKind};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

pub const SUBMIT_ERROR_MSG: &str =
    "Sorry, there was an error submitting your assessment. Please try again.";
pub const SUBMIT_EVENT: &str = "assessment_completed";

/// Pause between a confirmed submission and the redirect.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// A submission ready to hand to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    /// `{ "assessment_data": {..}, "meta": {..} }`
    pub envelope: JsonValue,
    pub submission_id: String,
    pub duration_minutes: i64,
    pub completion_rate: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BeginSubmit {
    Ready(SubmissionRequest),
    /// A submission is already in flight (or confirmed).
    Busy,
    /// The current section failed validation; inline errors are set.
    Invalid,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Confirmed {
        response: SubmissionResponse,
        target: ConfirmationTarget,
        redirect_after: Duration,
    },
    Failed {
        error: AppError,
    },
}

/// `<prefix>-<epoch millis>-<0..999>`
pub fn new_submission_id(prefix: &str, now: DateTime<Utc>) -> String {
    let n: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{prefix}-{}-{n}", now.timestamp_millis())
}

/// Validate the current section and build the submission envelope.
///
/// On `Ready` the state is marked busy until `finish_submit` runs.
pub fn begin_submit(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    now: DateTime<Utc>,
) -> BeginSubmit {
    if state.submit_busy {
        tracing::debug!("submit ignored; already in flight");
        return BeginSubmit::Busy;
    }

    let current = state.nav.current_section;
    if !validate_section(state, fctx, current) {
        return BeginSubmit::Invalid;
    }

    let data = collect_all_form_data(state, now);
    let minutes = duration_minutes(state.started_at, now);
    let rate = data
        .get(STATISTICS_KEY)
        .and_then(|s| s.get("completion_rate"))
        .and_then(JsonValue::as_u64)
        .unwrap_or_else(|| completion_rate(0, state.registry.field_count()));

    let tpl = state.registry.template();
    let submission_id = new_submission_id(&tpl.reference_prefix, now);

    let envelope = json!({
        "assessment_data": data,
        "meta": {
            "timestamp": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            "assessment_version": tpl.version,
            "user_agent": fctx.client.user_agent,
            "screen_resolution": fctx.client.screen_resolution,
            "completed_sections": state.nav.total_sections,
            "submission_id": submission_id,
            "form_duration_minutes": minutes,
            "total_fields": state.registry.field_count(),
        }
    });

    state.submit_busy = true;
    tracing::info!(%submission_id, completion_rate = rate, "submitting assessment");

    BeginSubmit::Ready(SubmissionRequest {
        envelope,
        submission_id,
        duration_minutes: minutes,
        completion_rate: rate,
    })
}

/// Apply a backend result.
///
/// Success clears local progress, tracks the completion and yields the
/// confirmation target; the state stays busy. Failure keeps progress,
/// re-enables submit and shows the error toast.
pub fn finish_submit(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    req: &SubmissionRequest,
    result: Result<SubmissionResponse, AppError>,
    now: DateTime<Utc>,
) -> SubmitOutcome {
    match result {
        Ok(response) => {
            if let Err(e) = persist::clear(fctx) {
                tracing::warn!(error = %e, "clearing saved progress failed");
            }

            let reference = generate_reference(&state.registry.template().reference_prefix, now);

            fctx.track(
                SUBMIT_EVENT,
                json!({
                    "sections": state.nav.total_sections,
                    "duration_minutes": req.duration_minutes,
                    "completion_rate": req.completion_rate,
                }),
            );

            tracing::info!(
                submission_id = %req.submission_id,
                assessment_id = %response.assessment_id,
                %reference,
                "assessment confirmed"
            );

            SubmitOutcome::Confirmed {
                response,
                target: ConfirmationTarget::completed(reference),
                redirect_after: REDIRECT_DELAY,
            }
        }
        Err(error) => {
            state.submit_busy = false;
            tracing::error!(submission_id = %req.submission_id, error = %error, "submission failed");
            fctx.notify(SUBMIT_ERROR_MSG, UserMsgKind::Error);
            SubmitOutcome::Failed { error }
        }
    }
}

/// Whole submission on the calling thread.
pub fn submit_blocking(
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    backend: &dyn SubmissionBackend,
    now: DateTime<Utc>,
) -> Option<SubmitOutcome> {
    let req = match begin_submit(state, fctx, now) {
        BeginSubmit::Ready(req) => req,
        BeginSubmit::Busy | BeginSubmit::Invalid => return None,
    };
    let result = backend.submit(&req.envelope);
    Some(finish_submit(state, fctx, &req, result, Utc::now()))
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::command::questionnaire::nav::advance;
    use crate::command::questionnaire::test_support::{fill_section, fresh};
    use crate::confirmation::is_valid_reference;

    struct FailingBackend;

    impl SubmissionBackend for FailingBackend {
        fn submit(&self, _envelope: &JsonValue) -> crate::error::AppResult<SubmissionResponse> {
            Err(AppError::SubmissionRejected { status: 503 })
        }
    }

    fn to_last_section(state: &mut QuestionnaireState, fctx: &FormCtx) {
        for n in 1..state.total_sections() {
            fill_section(state, fctx, n);
            assert!(advance(state, fctx));
        }
        let last = state.total_sections();
        fill_section(state, fctx, last);
    }

    #[test]
    fn submission_id_shape() {
        let now = Utc::now();
        let id = new_submission_id("RCH", now);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "RCH");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert!(parts[2].parse::<u16>().unwrap() < 1000);
    }

    #[test]
    fn invalid_last_section_blocks_submit() {
        let (_td, mut state, fctx) = fresh();
        for n in 1..8 {
            fill_section(&mut state, &fctx, n);
            assert!(advance(&mut state, &fctx));
        }
        assert_eq!(begin_submit(&mut state, &fctx, Utc::now()), BeginSubmit::Invalid);
        assert!(!state.submit_busy);
        assert!(state.model.error("timeline_001").is_some());
    }

    #[test]
    fn envelope_carries_data_and_meta() {
        let (_td, mut state, fctx) = fresh();
        to_last_section(&mut state, &fctx);

        let BeginSubmit::Ready(req) = begin_submit(&mut state, &fctx, Utc::now()) else {
            panic!("expected ready");
        };
        assert!(state.submit_busy);

        let meta = &req.envelope["meta"];
        assert_eq!(meta["assessment_version"], "1.0");
        assert_eq!(meta["completed_sections"], 8);
        assert_eq!(meta["total_fields"], state.registry.field_count());
        assert_eq!(meta["submission_id"], req.submission_id.as_str());
        assert!(meta["timestamp"].as_str().unwrap().ends_with('Z'));

        let data = &req.envelope["assessment_data"];
        assert_eq!(data["contact"]["contact_002"], "jane@example.com");
        assert!(data[STATISTICS_KEY]["completion_rate"].as_u64().unwrap() > 0);

        assert_eq!(begin_submit(&mut state, &fctx, Utc::now()), BeginSubmit::Busy);
    }

    #[test]
    fn success_clears_progress_and_targets_confirmation() {
        let (_td, mut state, fctx) = fresh();
        to_last_section(&mut state, &fctx);
        assert!(fctx.store.exists());

        let backend = SimulatedBackend::with_latency(Duration::ZERO);
        let out = submit_blocking(&mut state, &fctx, &backend, Utc::now()).unwrap();

        let SubmitOutcome::Confirmed { target, redirect_after, .. } = out else {
            panic!("expected confirmed");
        };
        assert!(target.completed);
        assert!(is_valid_reference("RCH", &target.reference));
        assert_eq!(redirect_after, REDIRECT_DELAY);
        assert!(!fctx.store.exists());
        assert!(state.submit_busy);
    }

    #[test]
    fn failure_keeps_progress_and_reenables_submit() {
        let (_td, mut state, fctx) = fresh();
        to_last_section(&mut state, &fctx);

        let out = submit_blocking(&mut state, &fctx, &FailingBackend, Utc::now()).unwrap();
        assert!(matches!(
            out,
            SubmitOutcome::Failed {
                error: AppError::SubmissionRejected { status: 503 }
            }
        ));
        assert!(fctx.store.exists());
        assert!(!state.submit_busy);
        assert_eq!(state.current_section(), 8);
    }
}
