// src/command/questionnaire/nav.rs

use crate::command::questionnaire::types::{
    FormCtx, MilestoneNotice, ProgressTier, QuestionnaireError, QuestionnaireState,
    MILESTONE_BODY, MILESTONE_TITLE,
};
use crate::command::questionnaire::validate::validate_section;

/// Validate the current section and move forward one step.
///
/// Returns `true` when the section changed. A failing section leaves everything
/// in place apart from its inline errors.
pub fn advance(state: &mut QuestionnaireState, fctx: &FormCtx) -> bool {
    let current = state.nav.current_section;
    if !validate_section(state, fctx, current) {
        return false;
    }
    if current >= state.nav.total_sections {
        return false;
    }

    state.nav.current_section = current + 1;

    let milestone = state.registry.template().milestone_section;
    if milestone == Some(state.nav.current_section) && !state.nav.milestone_shown {
        state.nav.milestone_shown = true;
        state.view.milestone = Some(MilestoneNotice {
            title: MILESTONE_TITLE,
            body: MILESTONE_BODY,
        });
    }

    show_current(state);
    true
}

/// Move back one step. No validation.
pub fn retreat(state: &mut QuestionnaireState) -> bool {
    if state.nav.current_section <= 1 {
        return false;
    }
    state.nav.current_section -= 1;
    show_current(state);
    true
}

fn show_current(state: &mut QuestionnaireState) {
    let n = state.nav.current_section;
    if let Err(e) = render(state, n) {
        tracing::warn!(error = %e, "render after navigation failed");
    }
    update_progress(state);
    state.view.scroll_to_top = true;
}

/// Show exactly section `n` and set the navigation buttons for it.
pub fn render(state: &mut QuestionnaireState, n: usize) -> Result<(), QuestionnaireError> {
    let total = state.nav.total_sections;
    if n == 0 || n > total {
        tracing::warn!(section = n, total, "section not found; render ignored");
        return Err(QuestionnaireError::InvalidSectionIndex {
            section: n,
            section_count: total,
        });
    }

    state.view.sections_visible = (1..=total).map(|i| i == n).collect();
    state.view.prev_visible = n != 1;
    state.view.next_visible = n != total;
    state.view.submit_visible = n == total;
    Ok(())
}

pub fn update_progress(state: &mut QuestionnaireState) {
    let current = state.nav.current_section;
    let total = state.nav.total_sections.max(1);
    let percent = current as f32 / total as f32 * 100.0;

    let p = &mut state.view.progress;
    p.percent = percent;
    p.counter = format!("Section {current} of {total}");
    p.motivation = state
        .registry
        .section(current)
        .map(|s| s.motivation.clone());
    p.tier = if percent >= 50.0 {
        ProgressTier::Halfway
    } else {
        ProgressTier::Early
    };
}

pub fn take_milestone(state: &mut QuestionnaireState) -> Option<MilestoneNotice> {
    state.view.milestone.take()
}

pub fn take_scroll_to_top(state: &mut QuestionnaireState) -> bool {
    std::mem::take(&mut state.view.scroll_to_top)
}

// ======================================================
// Unit Tests
// ======================================================
