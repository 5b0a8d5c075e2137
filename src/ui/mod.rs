// src/ui/mod.rs

pub mod message;
pub mod panel_confirmation;
pub mod panel_questionnaire;
pub mod widgets;

use eframe::egui;
use std::sync::Arc;

use care_questionnaire_lib::backend::{backend_from_ctx, SimulatedBackend, SubmissionBackend};
use care_questionnaire_lib::collab::{Collaborator, DesktopCollaborator};
use care_questionnaire_lib::command::questionnaire::{self as q, ClientEnv, FormCtx};
use care_questionnaire_lib::context::AppCtx;
use care_questionnaire_lib::snapshot_store::SnapshotStore;

use message::PanelMsgState;
use panel_confirmation::ConfirmationPanel;
use panel_questionnaire::QuestionnairePanel;
use widgets::ui_toast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Questionnaire,
    Confirmation,
}

pub struct UiApp {
    ctx: Arc<AppCtx>,
    collab: Option<Arc<DesktopCollaborator>>,
    client: ClientEnv,
    backend: Arc<dyn SubmissionBackend>,

    route: Route,
    questionnaire: QuestionnairePanel,
    confirmation: ConfirmationPanel,

    /// Last screen-reader announcement, shown as a status line.
    live_region: String,
    startup_warn: PanelMsgState,
}

impl UiApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        ctx: Arc<AppCtx>,
        collab: Option<Arc<DesktopCollaborator>>,
    ) -> Self {
        let screen = cc.egui_ctx.screen_rect();
        let client = ClientEnv::desktop(screen.width() as u32, screen.height() as u32);

        let mut startup_warn = PanelMsgState::default();
        let backend: Arc<dyn SubmissionBackend> = match backend_from_ctx(&ctx) {
            Ok(b) => Arc::from(b),
            Err(e) => {
                tracing::warn!(error = %e, "submission backend unavailable; falling back to simulated");
                startup_warn.set_warn("Submission service unavailable; running in offline mode.");
                Arc::new(SimulatedBackend::default())
            }
        };

        let questionnaire = build_questionnaire(&ctx, collab.as_ref(), &client, backend.clone());

        Self {
            ctx,
            collab,
            client,
            backend,
            route: Route::Questionnaire,
            questionnaire,
            confirmation: ConfirmationPanel::new(),
            live_region: String::new(),
            startup_warn,
        }
    }
}

fn build_questionnaire(
    ctx: &AppCtx,
    collab: Option<&Arc<DesktopCollaborator>>,
    client: &ClientEnv,
    backend: Arc<dyn SubmissionBackend>,
) -> QuestionnairePanel {
    let mut fctx =
        FormCtx::new(SnapshotStore::in_dir(&ctx.app_data_dir)).with_client(client.clone());
    if let Some(c) = collab {
        let c: Arc<dyn Collaborator> = c.clone();
        fctx = fctx.with_collaborator(c);
    }

    QuestionnairePanel::new(q::load_questionnaire_for_ctx(ctx), fctx, backend)
}

impl eframe::App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let debug_ui = cfg!(debug_assertions) || self.ctx.debug_ui;

        if let Some(c) = self.collab.as_ref() {
            if let Some(last) = c.take_announcements().pop() {
                self.live_region = last;
            }
        }

        egui::TopBottomPanel::top("toast").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("Care Home Assessment");
            if let Some(c) = self.collab.as_ref() {
                if let Some(n) = c.current_notification() {
                    if ui_toast(ui, &n) {
                        c.hide_notification(n.id);
                    }
                    ctx.request_repaint_after(care_questionnaire_lib::collab::NOTIFICATION_TTL);
                }
            }
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("live_region").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.small(&self.live_region);

                if !debug_ui {
                    return;
                }
                let last = self
                    .collab
                    .as_ref()
                    .and_then(|c| c.recent_events(1).pop());
                if let Some(ev) = last {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.small(format!("{} @ {}", ev.name, ev.at.format("%H:%M:%S")));
                    });
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.startup_warn.show(ui, debug_ui);

            match self.route {
                Route::Questionnaire => {
                    if let Some(redirect) = self.questionnaire.ui(ui, debug_ui) {
                        self.confirmation.open(
                            &redirect.target.location(),
                            &redirect.reference_prefix,
                            &self.client,
                            self.collab.as_deref().map(|c| c as &dyn Collaborator),
                            &self.ctx.last_completion_path(),
                            Some(redirect.next_steps),
                        );
                        self.route = Route::Confirmation;
                    }
                }

                Route::Confirmation => {
                    let collab = self.collab.as_deref().map(|c| c as &dyn Collaborator);
                    let restart = self.confirmation.ui(ui, collab);
                    if restart {
                        self.questionnaire = build_questionnaire(
                            &self.ctx,
                            self.collab.as_ref(),
                            &self.client,
                            self.backend.clone(),
                        );
                        self.route = Route::Questionnaire;
                    }
                }
            }
        });
    }
}
