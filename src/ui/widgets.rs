// src/ui/widgets.rs

use eframe::egui;

use super::message::kind_colors;
use care_questionnaire_lib::collab::Notification;

pub fn copy_icon_button(ui: &mut egui::Ui, enabled: bool, hover: &str) -> bool {
    ui.add_enabled(enabled, egui::Button::new("⧉"))
        .on_hover_text(hover)
        .clicked()
}

pub fn ui_notice(ui: &mut egui::Ui, title: &str, body: &str) {
    // Bright "attention" yellow; readable in dark and light mode.
    let accent = egui::Color32::from_rgb(255, 215, 90);

    let stroke = egui::Stroke::new(1.5, accent);
    let fill = egui::Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 48);

    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(12))
        .stroke(stroke)
        .fill(fill)
        .corner_radius(egui::CornerRadius::same(8))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(title).size(18.0).strong().color(accent));
            ui.add_space(4.0);
            ui.label(body);
        });
}

/// Toast strip. Returns `true` when the close button was clicked.
pub fn ui_toast(ui: &mut egui::Ui, n: &Notification) -> bool {
    let (stroke, fill) = kind_colors(n.kind);
    let mut closed = false;

    egui::Frame::NONE
        .fill(fill)
        .stroke(egui::Stroke::new(1.0, stroke))
        .corner_radius(egui::CornerRadius::same(8u8))
        .inner_margin(egui::Margin::same(8))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(stroke, &n.message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    closed = ui.small_button("✕").on_hover_text("Dismiss").clicked();
                });
            });
        });

    closed
}

/// Error line under a field.
pub fn field_error(ui: &mut egui::Ui, msg: &str) {
    ui.colored_label(egui::Color32::from_rgb(255, 60, 60), msg);
}
