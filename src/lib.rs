// src/lib.rs

pub mod analytics_log;
pub mod backend;
pub mod collab;
pub mod command;
pub mod confirmation;
pub mod context;
pub mod error;
pub mod snapshot_store;
pub mod template;

use crate::collab::DesktopCollaborator;
use crate::context::AppCtx;
use std::sync::Arc;

/// Create the data dir and the collaborator that logs analytics into it.
pub fn init_collaborator(ctx: &AppCtx) -> Result<Arc<DesktopCollaborator>, String> {
    std::fs::create_dir_all(&ctx.app_data_dir)
        .map_err(|e| format!("Failed to create app data dir: {e}"))?;

    let collab = DesktopCollaborator::with_log_dir(&ctx.app_data_dir)
        .map_err(|e| format!("Failed to open analytics log: {e}"))?;

    Ok(Arc::new(collab))
}
