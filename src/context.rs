// src/context.rs

use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "org";
pub const APP_ORG: &str = "carehome";
pub const APP_ID: &str = "care-questionnaire";

/// The single local snapshot slot, named after its fixed storage key.
pub const SNAPSHOT_FILE_NAME: &str = "careHomeQuestionnaire.json";
pub const LAST_COMPLETION_FILE_NAME: &str = "lastCompletionData.json";

pub const ENV_DATA_DIR: &str = "CARE_QUESTIONNAIRE_DATA_DIR";
pub const ENV_DEBUG: &str = "CARE_QUESTIONNAIRE_DEBUG";
pub const ENV_ENDPOINT: &str = "CARE_QUESTIONNAIRE_ENDPOINT";
pub const ENV_SCHEMA: &str = "CARE_QUESTIONNAIRE_SCHEMA";

#[derive(Debug, Clone)]
pub struct AppCtx {
    pub app_data_dir: PathBuf,
    pub debug_ui: bool,
    /// When set, submissions POST here instead of the simulated backend.
    pub endpoint: Option<String>,
    /// JSON5 schema override; the bundled schema is used otherwise.
    pub schema_path: Option<PathBuf>,
}

impl AppCtx {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let debug_ui = std::env::var(ENV_DEBUG)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let endpoint = std::env::var(ENV_ENDPOINT)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let schema_path = std::env::var(ENV_SCHEMA)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            app_data_dir,
            debug_ui,
            endpoint,
            schema_path,
        }
    }

    /// Data dir from the environment override, else the platform data dir.
    pub fn resolve_data_dir() -> Option<PathBuf> {
        if let Ok(p) = std::env::var(ENV_DATA_DIR) {
            if !p.trim().is_empty() {
                return Some(PathBuf::from(p));
            }
        }
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_ID).map(|d| d.data_dir().to_path_buf())
    }

    /// <app_data>/lastCompletionData.json
    pub fn last_completion_path(&self) -> PathBuf {
        self.app_data_dir.join(LAST_COMPLETION_FILE_NAME)
    }
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_data_dir() {
        let ctx = AppCtx::new(PathBuf::from("/tmp/cq"));
        assert_eq!(
            ctx.last_completion_path(),
            PathBuf::from("/tmp/cq/lastCompletionData.json")
        );
    }
}
