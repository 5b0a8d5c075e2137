// src/ui/panel_questionnaire.rs

use crate::ui::message::PanelMsgState;
use crate::ui::widgets::{field_error, ui_notice};
use eframe::egui;

use care_questionnaire_lib::backend::{NextSteps, SubmissionBackend, SubmissionResponse};
use care_questionnaire_lib::command::questionnaire::{
    self as q, BeginSubmit, FormCtx, MilestoneNotice, Progress, QuestionnaireError,
    QuestionnaireState, RatingKey, SubmissionRequest, SubmitOutcome,
};
use care_questionnaire_lib::confirmation::ConfirmationTarget;
use care_questionnaire_lib::error::{AppError, AppResult};
use care_questionnaire_lib::template::questionnaire::{FieldKind, FieldSpec, TextFormat};
use care_questionnaire_lib::template::registry::FieldRegistry;

use chrono::Utc;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MILESTONE_DISPLAY: Duration = Duration::from_secs(4);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handed to the confirmation page once the redirect delay has passed.
pub struct Redirect {
    pub target: ConfirmationTarget,
    pub next_steps: NextSteps,
    pub reference_prefix: String,
}

struct InFlight {
    req: SubmissionRequest,
    rx: mpsc::Receiver<AppResult<SubmissionResponse>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NavAction {
    Prev,
    Next,
    Submit,
}

pub struct QuestionnairePanel {
    msg: PanelMsgState,
    state: Option<QuestionnaireState>,
    fctx: FormCtx,
    backend: Arc<dyn SubmissionBackend>,
    in_flight: Option<InFlight>,
    redirect: Option<(Instant, Redirect)>,
    milestone: Option<(MilestoneNotice, Instant)>,
}

impl QuestionnairePanel {
    pub fn new(
        registry: Result<FieldRegistry, QuestionnaireError>,
        fctx: FormCtx,
        backend: Arc<dyn SubmissionBackend>,
    ) -> Self {
        let mut msg = PanelMsgState::default();
        let state = match registry {
            Ok(r) => Some(q::start(r, &fctx, Utc::now())),
            Err(e) => {
                tracing::error!(error = %e, "questionnaire schema failed to load");
                msg.set_error(format!("The questionnaire could not be loaded: {e}"));
                None
            }
        };

        Self {
            msg,
            state,
            fctx,
            backend,
            in_flight: None,
            redirect: None,
            milestone: None,
        }
    }

    /// Returns the redirect once a confirmed submission's delay has elapsed.
    pub fn ui(&mut self, ui: &mut egui::Ui, debug_ui: bool) -> Option<Redirect> {
        self.poll_submission(ui.ctx(), debug_ui);

        if let Some((deadline, _)) = self.redirect.as_ref() {
            let now = Instant::now();
            if now >= *deadline {
                return self.redirect.take().map(|(_, r)| r);
            }
            ui.ctx().request_repaint_after(*deadline - now);
        }

        self.msg.show(ui, debug_ui);

        let Some(state) = self.state.as_mut() else {
            return None;
        };

        ui_progress(ui, &state.view.progress);
        ui.add_space(8.0);

        if let Some(m) = q::take_milestone(state) {
            self.milestone = Some((m, Instant::now()));
        }
        if let Some((m, at)) = self.milestone {
            let shown_for = at.elapsed();
            if shown_for < MILESTONE_DISPLAY {
                ui_notice(ui, m.title, m.body);
                ui.add_space(8.0);
                ui.ctx()
                    .request_repaint_after(MILESTONE_DISPLAY.saturating_sub(shown_for));
            } else {
                self.milestone = None;
            }
        }

        if self.in_flight.is_some() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Submitting your assessment...");
            });
            ui.add_space(8.0);
        }

        let scroll_top = q::take_scroll_to_top(state);
        let busy = state.submit_busy;
        let fctx = &self.fctx;
        let mut action = None;

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                if scroll_top {
                    ui.scroll_to_cursor(Some(egui::Align::TOP));
                }

                for n in state.view.visible_sections() {
                    ui_section(ui, state, fctx, n);
                }

                ui.add_space(12.0);
                action = ui_nav_buttons(ui, state, busy);
            });

        match action {
            Some(NavAction::Prev) => {
                q::retreat(state);
            }
            Some(NavAction::Next) => {
                if !q::advance(state, &self.fctx) {
                    tracing::debug!(
                        section = state.current_section(),
                        errors = state.model.error_count(),
                        "advance blocked"
                    );
                }
            }
            Some(NavAction::Submit) => match q::begin_submit(state, &self.fctx, Utc::now()) {
                BeginSubmit::Ready(req) => {
                    self.msg.clear();
                    self.in_flight = Some(spawn_submit(
                        self.backend.clone(),
                        req,
                        ui.ctx().clone(),
                    ));
                }
                BeginSubmit::Busy | BeginSubmit::Invalid => {}
            },
            None => {}
        }

        None
    }

    fn poll_submission(&mut self, ctx: &egui::Context, debug_ui: bool) {
        let Some(inflight) = self.in_flight.as_ref() else {
            return;
        };

        let result = match inflight.rx.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) => {
                ctx.request_repaint_after(POLL_INTERVAL);
                return;
            }
            Err(TryRecvError::Disconnected) => Err(AppError::SubmissionTransport(
                "submission worker stopped".into(),
            )),
        };

        let (Some(inflight), Some(state)) = (self.in_flight.take(), self.state.as_mut()) else {
            return;
        };

        match q::finish_submit(state, &self.fctx, &inflight.req, result, Utc::now()) {
            SubmitOutcome::Confirmed {
                response,
                target,
                redirect_after,
            } => {
                self.msg.set_success(response.message.clone());
                self.redirect = Some((
                    Instant::now() + redirect_after,
                    Redirect {
                        target,
                        next_steps: response.next_steps,
                        reference_prefix: state.registry.template().reference_prefix.clone(),
                    },
                ));
                ctx.request_repaint_after(redirect_after);
            }
            SubmitOutcome::Failed { error } => {
                // The toast carries the user-facing text; keep the detail for debug builds.
                if debug_ui {
                    self.msg.from_app_error(&error);
                }
            }
        }
    }
}

fn spawn_submit(
    backend: Arc<dyn SubmissionBackend>,
    req: SubmissionRequest,
    repaint: egui::Context,
) -> InFlight {
    let (tx, rx) = mpsc::channel();
    let envelope = req.envelope.clone();

    std::thread::spawn(move || {
        let r = backend.submit(&envelope);
        let _ = tx.send(r);
        repaint.request_repaint();
    });

    InFlight { req, rx }
}

fn ui_progress(ui: &mut egui::Ui, p: &Progress) {
    ui.group(|ui| {
        if let Some(m) = p.motivation.as_ref() {
            ui.label(egui::RichText::new(&m.title).strong().size(18.0));
            ui.label(&m.subtitle);
            ui.add_space(6.0);
        }
        ui.add(
            egui::ProgressBar::new(p.percent / 100.0)
                .text(&p.counter)
                .desired_height(18.0),
        );
    });
}

fn ui_section(ui: &mut egui::Ui, state: &mut QuestionnaireState, fctx: &FormCtx, n: usize) {
    let Some(section) = state.registry.section(n) else {
        return;
    };
    let title = section.title.clone();
    let specs = section.fields.clone();

    ui.heading(title);
    ui.add_space(8.0);

    for spec in specs.iter() {
        ui_field(ui, state, fctx, spec);
    }
}

fn ui_field(ui: &mut egui::Ui, state: &mut QuestionnaireState, fctx: &FormCtx, spec: &FieldSpec) {
    let Some(st) = state.model.get(&spec.name) else {
        return;
    };
    if st.hidden || spec.kind == FieldKind::Hidden {
        return;
    }
    let label = if st.required {
        format!("{} *", spec.label)
    } else {
        spec.label.clone()
    };
    let error = st.error.clone();

    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.label(egui::RichText::new(label).strong());
        ui.add_space(4.0);

        let res = match spec.kind {
            FieldKind::SingleChoice => ui_single(ui, state, fctx, spec),
            FieldKind::MultiChoice => ui_multi(ui, state, fctx, spec),
            FieldKind::Rating => ui_rating(ui, state, fctx, spec),
            FieldKind::Text => ui_text(ui, state, fctx, spec),
            FieldKind::Hidden => Ok(()),
        };
        if let Err(e) = res {
            tracing::debug!(field = %spec.name, error = %e, "interaction rejected");
        }

        if let Some(msg) = error.as_deref() {
            field_error(ui, msg);
        }
    });
    ui.add_space(6.0);
}

fn ui_single(
    ui: &mut egui::Ui,
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    spec: &FieldSpec,
) -> Result<(), QuestionnaireError> {
    let mut res = Ok(());
    for o in spec.options.iter() {
        let selected = state.model.is_selected(&spec.name, &o.value);
        if ui.radio(selected, &o.label).clicked() {
            res = q::click_option_row(state, fctx, &spec.name, &o.value);
        }
    }
    res
}

fn ui_multi(
    ui: &mut egui::Ui,
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    spec: &FieldSpec,
) -> Result<(), QuestionnaireError> {
    let mut res = Ok(());
    for o in spec.options.iter() {
        let mut checked = state.model.is_checked(&spec.name, &o.value);
        if ui.checkbox(&mut checked, &o.label).changed() {
            res = q::change_input(state, fctx, &spec.name, &o.value, checked);
        }
    }
    res
}

fn ui_rating(
    ui: &mut egui::Ui,
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    spec: &FieldSpec,
) -> Result<(), QuestionnaireError> {
    let values = spec.rating_values();

    let responses = ui
        .horizontal(|ui| {
            values
                .iter()
                .map(|v| {
                    let selected = state.model.is_selected(&spec.name, v);
                    ui.add(
                        egui::Button::new(egui::RichText::new(v).size(16.0))
                            .selected(selected)
                            .min_size(egui::vec2(40.0, 32.0)),
                    )
                })
                .collect::<Vec<_>>()
        })
        .inner;

    let mut res = Ok(());
    let mut move_focus = None;

    for (i, (v, r)) in values.iter().zip(responses.iter()).enumerate() {
        // Mouse, Enter and Space all arrive as a click.
        if r.clicked() {
            res = q::click_rating(state, fctx, &spec.name, v);
        }
        if r.has_focus() {
            let key = ui.input(|inp| {
                if inp.key_pressed(egui::Key::ArrowLeft) {
                    Some(RatingKey::ArrowLeft)
                } else if inp.key_pressed(egui::Key::ArrowRight) {
                    Some(RatingKey::ArrowRight)
                } else {
                    None
                }
            });
            if let Some(key) = key {
                match q::rating_key(state, fctx, &spec.name, i, key) {
                    Ok(j) => move_focus = Some(j),
                    Err(e) => res = Err(e),
                }
            }
        }
    }

    if let Some(r) = move_focus.and_then(|j| responses.get(j)) {
        r.request_focus();
    }
    res
}

fn ui_text(
    ui: &mut egui::Ui,
    state: &mut QuestionnaireState,
    fctx: &FormCtx,
    spec: &FieldSpec,
) -> Result<(), QuestionnaireError> {
    let mut buf = state.model.raw(&spec.name).unwrap_or("").to_string();
    let hint = match spec.format {
        Some(TextFormat::Email) => "name@example.com",
        None => "",
    };

    let resp = ui.add(
        egui::TextEdit::singleline(&mut buf)
            .hint_text(hint)
            .desired_width(f32::INFINITY),
    );
    if resp.changed() {
        q::set_text(state, fctx, &spec.name, &buf)
    } else {
        Ok(())
    }
}

fn ui_nav_buttons(ui: &mut egui::Ui, state: &QuestionnaireState, busy: bool) -> Option<NavAction> {
    let mut action = None;
    let button_height = 32.0;

    ui.horizontal(|ui| {
        if state.view.prev_visible {
            let b = egui::Button::new(egui::RichText::new("← Previous").size(16.0))
                .min_size(egui::vec2(110.0, button_height));
            if ui.add_enabled(!busy, b).clicked() {
                action = Some(NavAction::Prev);
            }
            ui.add_space(8.0);
        }

        if state.view.next_visible {
            let b = egui::Button::new(egui::RichText::new("Next →").size(16.0))
                .min_size(egui::vec2(120.0, button_height));
            if ui.add(b).clicked() {
                action = Some(NavAction::Next);
            }
        }

        if state.view.submit_visible {
            let label = if busy { "Submitting..." } else { "Submit Assessment" };
            let b = egui::Button::new(egui::RichText::new(label).size(16.0).strong())
                .min_size(egui::vec2(180.0, button_height));
            if ui.add_enabled(!busy, b).clicked() {
                action = Some(NavAction::Submit);
            }
        }
    });

    action
}
