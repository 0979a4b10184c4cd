//! Shared egui widgets for the region menu and hover readout

use bevy_egui::egui;
use brainview_core::{PartGroup, PartRegistry, Rgb, ViewMode};

use crate::types::{PartCommand, UiLayout};

pub fn color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

/// Color of a group's first part
fn group_color<H>(registry: &PartRegistry<H>, group: &PartGroup) -> Rgb {
    registry
        .group_parts(&group.name)
        .next()
        .map(|p| p.color)
        .unwrap_or(Rgb::FALLBACK)
}

/// Small filled square in a region's color
pub fn color_swatch(ui: &mut egui::Ui, rgb: Rgb, size: f32) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color32(rgb));
}

/// Menu/Hover switch. Returns the newly picked mode.
pub fn mode_switch(ui: &mut egui::Ui, current: ViewMode) -> Option<PartCommand> {
    let mut picked = current;
    ui.horizontal(|ui| {
        ui.label("Mode:");
        for mode in [ViewMode::Menu, ViewMode::Hover] {
            ui.selectable_value(&mut picked, mode, mode.label());
        }
    });
    (picked != current).then_some(PartCommand::SetMode(picked))
}

/// One button per display-name group, in registration order, plus a reset
pub fn region_menu<H>(
    ui: &mut egui::Ui,
    registry: &PartRegistry<H>,
    layout: &UiLayout,
) -> Option<PartCommand> {
    let scale = layout.ui_scale();
    let selected = registry.selected_group();
    let mut command = None;

    if registry.is_empty() {
        ui.label(egui::RichText::new("No regions loaded").color(egui::Color32::GRAY));
        return None;
    }

    for group in registry.groups() {
        let color = group_color(registry, group);
        let is_selected = selected == Some(group.name.as_str());

        ui.horizontal(|ui| {
            color_swatch(ui, color, 12.0 * scale);
            let text = egui::RichText::new(&group.name).size(14.0 * scale);
            let response = ui.selectable_label(is_selected, text);
            if response.clicked() {
                command = Some(PartCommand::Toggle(group.name.clone()));
            }
            if group.members.len() > 1 {
                response.on_hover_text(format!("{} parts", group.members.len()));
            }
        });
    }

    ui.add_space(6.0);
    if ui
        .add_enabled(selected.is_some(), egui::Button::new("Show all points"))
        .clicked()
    {
        command = Some(PartCommand::Reset);
    }

    command
}

/// Label naming the region under the pointer
pub fn hover_caption(ui: &mut egui::Ui, label: Option<&str>, layout: &UiLayout) {
    let size = 16.0 * layout.ui_scale();
    match label {
        Some(name) => {
            ui.label(egui::RichText::new(name).size(size).strong());
        }
        None => {
            ui.label(
                egui::RichText::new("Point at the brain to inspect a region")
                    .size(size * 0.8)
                    .color(egui::Color32::GRAY),
            );
        }
    }
}

/// Read-only color key for hover mode, highlighting the hovered group
pub fn region_legend<H>(
    ui: &mut egui::Ui,
    registry: &PartRegistry<H>,
    hovered: Option<&str>,
    layout: &UiLayout,
) {
    let scale = layout.ui_scale();
    for group in registry.groups() {
        let color = group_color(registry, group);

        ui.horizontal(|ui| {
            color_swatch(ui, color, 10.0 * scale);
            let mut text = egui::RichText::new(&group.name).size(13.0 * scale);
            if hovered == Some(group.name.as_str()) {
                text = text.strong().color(egui::Color32::WHITE);
            } else {
                text = text.color(egui::Color32::GRAY);
            }
            ui.label(text);
        });
    }
}
