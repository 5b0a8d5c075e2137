// src/backend.rs

//! Submission backends. The questionnaire hands a finished envelope to a
//! `SubmissionBackend` and waits for its response.

use crate::context::{AppCtx, APP_ID};
use crate::error::{AppError, AppResult};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_secs(2);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextSteps {
    pub confirmation_email: String,
    pub expert_analysis: String,
    pub recommendations_delivery: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub assessment_id: String,
    pub message: String,
    pub timestamp: String,
    pub next_steps: NextSteps,
}

pub trait SubmissionBackend: Send + Sync {
    fn submit(&self, envelope: &JsonValue) -> AppResult<SubmissionResponse>;
}

/// Stand-in backend: waits `latency`, then accepts everything.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    pub latency: Duration,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self {
            latency: DEFAULT_SIMULATED_LATENCY,
        }
    }
}

impl SimulatedBackend {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl SubmissionBackend for SimulatedBackend {
    fn submit(&self, envelope: &JsonValue) -> AppResult<SubmissionResponse> {
        let assessment_id = envelope
            .pointer("/meta/submission_id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| AppError::SubmissionEncode("envelope has no submission_id".into()))?
            .to_string();

        tracing::debug!(%assessment_id, latency_ms = self.latency.as_millis() as u64, "simulated submit");
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        Ok(SubmissionResponse {
            success: true,
            assessment_id,
            message: "Assessment submitted successfully".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            next_steps: NextSteps {
                confirmation_email: "Within 2 hours".to_string(),
                expert_analysis: "Within 24 hours".to_string(),
                recommendations_delivery: "Within 48 hours".to_string(),
            },
        })
    }
}

/// Posts the envelope as JSON to `endpoint`.
pub struct HttpBackend {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("{APP_ID}/{}", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::SubmissionTransport(format!("client build failed: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl SubmissionBackend for HttpBackend {
    fn submit(&self, envelope: &JsonValue) -> AppResult<SubmissionResponse> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .map_err(|e| AppError::SubmissionTransport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(endpoint = %self.endpoint, status = status.as_u16(), "submission rejected");
            return Err(AppError::SubmissionRejected {
                status: status.as_u16(),
            });
        }

        let body: SubmissionResponse = resp
            .json()
            .map_err(|e| AppError::SubmissionInvalidResponse(e.to_string()))?;

        if !body.success {
            return Err(AppError::SubmissionInvalidResponse(format!(
                "backend reported failure: {}",
                body.message
            )));
        }

        Ok(body)
    }
}

/// HTTP when an endpoint is configured, simulated otherwise.
pub fn backend_from_ctx(ctx: &AppCtx) -> AppResult<Box<dyn SubmissionBackend>> {
    match ctx.endpoint.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!(endpoint = url, "using http submission backend");
            Ok(Box::new(HttpBackend::new(url.trim())?))
        }
        _ => {
            tracing::info!("no endpoint configured; using simulated submission backend");
            Ok(Box::new(SimulatedBackend::default()))
        }
    }
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn simulated_backend_echoes_submission_id() {
        let b = SimulatedBackend::with_latency(Duration::ZERO);
        let env = json!({ "assessment_data": {}, "meta": { "submission_id": "RCH-1-2" } });

        let r = b.submit(&env).unwrap();
        assert!(r.success);
        assert_eq!(r.assessment_id, "RCH-1-2");
        assert_eq!(r.next_steps.expert_analysis, "Within 24 hours");
    }

    #[test]
    fn simulated_backend_rejects_envelope_without_meta() {
        let b = SimulatedBackend::with_latency(Duration::ZERO);
        let err = b.submit(&json!({ "assessment_data": {} })).unwrap_err();
        assert!(matches!(err, AppError::SubmissionEncode(_)));
    }

    #[test]
    fn response_parses_from_wire_shape() {
        let r: SubmissionResponse = serde_json::from_value(json!({
            "success": true,
            "assessment_id": "RCH-1-2",
            "message": "ok",
            "timestamp": "2025-01-01T00:00:00.000Z",
            "next_steps": {
                "confirmation_email": "a",
                "expert_analysis": "b",
                "recommendations_delivery": "c"
            }
        }))
        .unwrap();
        assert_eq!(r.next_steps.recommendations_delivery, "c");
    }

    #[test]
    fn ctx_without_endpoint_is_simulated() {
        let td = tempfile::tempdir().unwrap();
        let ctx = AppCtx::new(td.path().to_path_buf());
        assert!(backend_from_ctx(&ctx).is_ok());
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let b = HttpBackend::new("http://127.0.0.1:9/submit").unwrap();
        let err = b.submit(&json!({})).unwrap_err();
        assert!(matches!(err, AppError::SubmissionTransport(_)));
    }
}
