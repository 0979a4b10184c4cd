//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::{UpdateMode, WinitSettings};
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use brainview_core::{ViewMode, ViewerConfig};
use brainview_scene::{BrainScenePlugin, CameraSettings, PickSettings, SceneSettings, UiLayout, ViewState};
use std::time::Duration;

use crate::asset_loader::AssetLoaderPlugin;
use crate::ui::UiPlugin;

/// Startup overrides taken from the page URL (`?model=`, `?mode=`,
/// `?config=`) or the command line
#[derive(Debug, Clone, Default, PartialEq, Resource)]
pub struct LaunchOptions {
    pub model: Option<String>,
    pub mode: Option<ViewMode>,
    /// Config location to fetch before loading the model (web only)
    pub config: Option<String>,
}

impl LaunchOptions {
    /// Build from a parameter lookup. Empty values count as absent and an
    /// unknown mode is ignored with a warning.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let mode = non_empty("mode").and_then(|m| match m.parse::<ViewMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!("Ignoring mode parameter: {}", e);
                None
            }
        });

        Self {
            model: non_empty("model"),
            mode,
            config: non_empty("config"),
        }
    }

    /// Read parameters from the page URL
    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Ok(location) = window.location().href() else {
            return Self::default();
        };
        let Ok(url) = web_sys::Url::new(&location) else {
            return Self::default();
        };

        let params = url.search_params();
        Self::from_lookup(|key| params.get(key))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_location() -> Self {
        Self::default()
    }

    pub fn mode_or(&self, config: &ViewerConfig) -> ViewMode {
        self.mode.unwrap_or(config.view.mode)
    }

    pub fn model_or(&self, config: &ViewerConfig) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| config.asset.model.clone())
    }
}

/// Configuration currently in effect
#[derive(Debug, Clone, Default, Resource)]
pub struct ActiveConfig(pub ViewerConfig);

/// Run with defaults and URL parameters (browser entry point)
pub fn run() {
    run_with(ViewerConfig::default(), LaunchOptions::from_location());
}

/// Run the Bevy application
pub fn run_with(config: ViewerConfig, options: LaunchOptions) {
    let mode = options.mode_or(&config);

    App::new()
        // Start with default continuous rendering - mobile will switch to power-saving mode
        .insert_resource(WinitSettings::default())
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Brainview".to_string(),
                        canvas: Some("#brainview-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Textures live next to the page, not under assets/
                    file_path: "".to_string(),
                    // Static hosting has no .meta files
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                })
                // The entry points install their own tracing subscriber
                .disable::<bevy::log::LogPlugin>(),
        )
        // Must be added before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(CameraSettings::from_config(&config.camera))
        .insert_resource(SceneSettings(config.scene.clone()))
        .insert_resource(PickSettings(config.picking.clone()))
        .insert_resource(ViewState {
            mode,
            hovered_label: None,
        })
        .insert_resource(ActiveConfig(config))
        .insert_resource(options)
        .init_resource::<UiLayout>()
        .add_plugins(BrainScenePlugin)
        .add_plugins(AssetLoaderPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Update, adjust_power_settings_for_mobile)
        .run();
}

/// On mobile, use power saving mode. On desktop, use continuous rendering for smooth 3D.
fn adjust_power_settings_for_mobile(
    layout: Res<UiLayout>,
    mut winit_settings: ResMut<WinitSettings>,
) {
    if !layout.is_changed() {
        return;
    }

    if layout.is_mobile {
        winit_settings.focused_mode = UpdateMode::reactive_low_power(Duration::from_millis(33));
        winit_settings.unfocused_mode = UpdateMode::reactive_low_power(Duration::from_millis(500));
    } else {
        *winit_settings = WinitSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let options = LaunchOptions::from_lookup(lookup(&[
            ("model", "models/small.obj"),
            ("mode", "hover"),
            ("config", "brainview.toml"),
        ]));
        assert_eq!(options.model.as_deref(), Some("models/small.obj"));
        assert_eq!(options.mode, Some(ViewMode::Hover));
        assert_eq!(options.config.as_deref(), Some("brainview.toml"));
    }

    #[test]
    fn test_empty_and_invalid_values() {
        let options = LaunchOptions::from_lookup(lookup(&[("model", " "), ("mode", "spin")]));
        assert_eq!(options, LaunchOptions::default());
    }

    #[test]
    fn test_fallbacks_to_config() {
        let mut config = ViewerConfig::default();
        config.view.mode = ViewMode::Hover;

        let options = LaunchOptions::default();
        assert_eq!(options.mode_or(&config), ViewMode::Hover);
        assert_eq!(options.model_or(&config), "models/brain-parts-big.obj");

        let options = LaunchOptions {
            model: Some("other.obj".into()),
            mode: Some(ViewMode::Menu),
            config: None,
        };
        assert_eq!(options.mode_or(&config), ViewMode::Menu);
        assert_eq!(options.model_or(&config), "other.obj");
    }
}
