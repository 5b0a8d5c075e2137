// src/main.rs

// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod ui;

use care_questionnaire_lib::context::AppCtx;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("care_questionnaire=info,care_questionnaire_lib=info")),
        )
        .with_target(false)
        .init();

    let app_data_dir: PathBuf = match AppCtx::resolve_data_dir() {
        Some(p) => p,
        // dev-only sandbox
        None => env::temp_dir().join("care-questionnaire-dev"),
    };

    let ctx = Arc::new(AppCtx::new(app_data_dir));
    tracing::info!(data_dir = %ctx.app_data_dir.display(), "starting");

    let collab = match care_questionnaire_lib::init_collaborator(&ctx) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(error = %e, "running without analytics log");
            None
        }
    };

    eframe::run_native(
        "Care Home Assessment",
        eframe::NativeOptions::default(),
        Box::new(move |cc| Ok(Box::new(ui::UiApp::new(cc, ctx.clone(), collab.clone())))),
    )
}
