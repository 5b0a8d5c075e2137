// src/ui/panel_confirmation.rs

use crate::ui::widgets::copy_icon_button;
use eframe::egui;

use care_questionnaire_lib::backend::NextSteps;
use care_questionnaire_lib::collab::Collaborator;
use care_questionnaire_lib::command::questionnaire::ClientEnv;
use care_questionnaire_lib::confirmation::{ConfirmationView, NOTIFICATION_DELAY};

use chrono::Utc;
use std::path::Path;
use std::time::Instant;

pub struct ConfirmationPanel {
    view: Option<ConfirmationView>,
    next_steps: Option<NextSteps>,
    opened_at: Instant,
    notified: bool,
}

impl ConfirmationPanel {
    pub fn new() -> Self {
        Self {
            view: None,
            next_steps: None,
            opened_at: Instant::now(),
            notified: false,
        }
    }

    /// Arrive at `location` (e.g. `confirmation?completed=true&ref=..`).
    pub fn open(
        &mut self,
        location: &str,
        reference_prefix: &str,
        client: &ClientEnv,
        collab: Option<&dyn Collaborator>,
        record_path: &Path,
        next_steps: Option<NextSteps>,
    ) {
        self.view = Some(ConfirmationView::open(
            location,
            reference_prefix,
            client,
            collab,
            record_path,
            Utc::now(),
        ));
        self.next_steps = next_steps;
        self.opened_at = Instant::now();
        self.notified = false;
    }

    /// Returns `true` when the user asks to start a new assessment.
    pub fn ui(&mut self, ui: &mut egui::Ui, collab: Option<&dyn Collaborator>) -> bool {
        let Some(view) = self.view.as_ref() else {
            ui.label("Nothing to show.");
            return false;
        };

        if !self.notified {
            if let Some((message, kind)) = view.pending_notification() {
                let waited = self.opened_at.elapsed();
                if waited >= NOTIFICATION_DELAY {
                    if let Some(c) = collab {
                        c.show_notification(message, kind);
                    }
                    self.notified = true;
                } else {
                    ui.ctx()
                        .request_repaint_after(NOTIFICATION_DELAY.saturating_sub(waited));
                }
            }
        }

        ui.add_space(12.0);
        ui.heading("Thank you!");
        ui.add_space(6.0);

        if view.completed {
            ui.label("Your care home assessment has been submitted.");
        } else {
            ui.label("Your care home assessment reference:");
        }

        ui.add_space(8.0);
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Reference number:");
                ui.label(egui::RichText::new(&view.reference).monospace().strong());
                if copy_icon_button(ui, true, "Copy reference number") {
                    ui.ctx().copy_text(view.reference.clone());
                }
            });
        });

        if let Some(steps) = self.next_steps.as_ref() {
            ui.add_space(12.0);
            ui.label(egui::RichText::new("What happens next").strong().size(16.0));
            ui.add_space(4.0);
            egui::Grid::new("next_steps")
                .num_columns(2)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Confirmation email");
                    ui.label(&steps.confirmation_email);
                    ui.end_row();

                    ui.label("Expert analysis");
                    ui.label(&steps.expert_analysis);
                    ui.end_row();

                    ui.label("Recommendations delivered");
                    ui.label(&steps.recommendations_delivery);
                    ui.end_row();
                });
        }

        ui.add_space(16.0);
        ui.button("Start a new assessment").clicked()
    }
}
