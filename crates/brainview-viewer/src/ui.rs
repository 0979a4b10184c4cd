//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use brainview_core::ViewMode;
use brainview_scene::ui::{hover_caption, mode_switch, region_legend, region_menu};
use brainview_scene::{BrainParts, PartCommand, UiLayout, ViewState};

use crate::app::ActiveConfig;
use crate::asset_loader::{LoadStatus, PendingLoad};

/// Grouped system parameters for the main UI system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub parts: Res<'w, BrainParts>,
    pub view: Res<'w, ViewState>,
    pub ui_layout: ResMut<'w, UiLayout>,
    pub status: Res<'w, LoadStatus>,
    pub config: Res<'w, ActiveConfig>,
    pub pending: Res<'w, PendingLoad>,
    pub commands: MessageWriter<'w, PartCommand>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, update_ui_layout)
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Update UI layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0
            || (ui_layout.screen_height - height).abs() > 1.0
        {
            let was_mobile = ui_layout.is_mobile;
            ui_layout.update_from_window(width, height);
            // Collapse the panel when switching to the compact layout
            if ui_layout.is_mobile && !was_mobile {
                ui_layout.show_panel = false;
            }
        }
    }
}

fn status_color(status: &LoadStatus) -> egui::Color32 {
    match status {
        LoadStatus::Loaded { .. } => egui::Color32::GREEN,
        LoadStatus::Failed { .. } => egui::Color32::RED,
        LoadStatus::Loading { .. } => egui::Color32::YELLOW,
        LoadStatus::Idle => egui::Color32::GRAY,
    }
}

fn ui_system(mut params: UiParams) {
    let is_mobile = params.ui_layout.is_mobile;
    let panel_width = params.ui_layout.panel_width();
    let ui_scale = params.ui_layout.ui_scale();
    let mode = params.view.mode;
    let mut requested: Vec<PartCommand> = Vec::new();

    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    if is_mobile {
        let mut style = (*ctx.style()).clone();
        style.spacing.button_padding = egui::vec2(6.0, 4.0);
        style.spacing.item_spacing = egui::vec2(4.0, 3.0);
        ctx.set_style(style);

        // Toolbar at the bottom to stay clear of curved screen edges
        egui::TopBottomPanel::bottom("mobile_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let menu_text = if params.ui_layout.show_panel { "☰ Regions" } else { "☰" };
                if ui
                    .button(egui::RichText::new(menu_text).size(16.0 * ui_scale))
                    .clicked()
                {
                    params.ui_layout.show_panel = !params.ui_layout.show_panel;
                }

                ui.separator();
                ui.colored_label(status_color(&params.status), "●");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(command) = mode_switch(ui, mode) {
                        requested.push(command);
                    }
                });
            });
        });
    }

    if !is_mobile || params.ui_layout.show_panel {
        egui::SidePanel::left("regions_panel")
            .default_width(panel_width)
            .resizable(!is_mobile)
            .show(ctx, |ui| {
                if is_mobile {
                    ui.horizontal(|ui| {
                        ui.heading(egui::RichText::new("Brain Regions").size(18.0 * ui_scale));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .button(egui::RichText::new("✕").size(18.0 * ui_scale))
                                .clicked()
                            {
                                params.ui_layout.show_panel = false;
                            }
                        });
                    });
                } else {
                    ui.heading("Brain Regions");
                }

                ui.horizontal(|ui| {
                    if params.status.is_loading() {
                        ui.spinner();
                    }
                    ui.colored_label(status_color(&params.status), params.status.describe());
                });

                #[cfg(target_arch = "wasm32")]
                {
                    let button = egui::Button::new(
                        egui::RichText::new("Open OBJ file…").size(14.0 * ui_scale),
                    );
                    if ui.add_enabled(!params.status.is_loading(), button).clicked() {
                        crate::asset_loader::open_file_picker(&params.pending);
                    }
                }

                ui.separator();

                if !is_mobile {
                    if let Some(command) = mode_switch(ui, mode) {
                        requested.push(command);
                    }
                    ui.separator();
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    match mode {
                        ViewMode::Menu => {
                            if let Some(command) =
                                region_menu(ui, &params.parts.registry, &params.ui_layout)
                            {
                                requested.push(command);
                            }
                        }
                        ViewMode::Hover => {
                            hover_caption(
                                ui,
                                params.view.hovered_label.as_deref(),
                                &params.ui_layout,
                            );
                            ui.add_space(6.0);
                            region_legend(
                                ui,
                                &params.parts.registry,
                                params.view.hovered_label.as_deref(),
                                &params.ui_layout,
                            );
                        }
                    }

                    if params.config.0.view.debug_panel {
                        ui.add_space(8.0);
                        egui::CollapsingHeader::new("Registry")
                            .default_open(false)
                            .show(ui, |ui| match params.parts.registry.summary_json() {
                                Ok(json) => {
                                    ui.label(egui::RichText::new(json).monospace().size(11.0));
                                }
                                Err(e) => {
                                    ui.colored_label(egui::Color32::RED, e.to_string());
                                }
                            });
                    }
                });
            });
    }

    // Floating readout so the hovered region stays visible with the panel closed
    if mode == ViewMode::Hover {
        if let Some(label) = &params.view.hovered_label {
            egui::Area::new(egui::Id::new("hover_label"))
                .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 16.0))
                .interactable(false)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(egui::RichText::new(label).size(18.0 * ui_scale).strong());
                    });
                });
        }
    }

    for command in requested {
        params.commands.write(command);
    }
}
