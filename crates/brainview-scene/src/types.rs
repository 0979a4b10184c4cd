//! Shared resources, components and messages for the brain scene

use bevy::prelude::*;
use brainview_core::config::{PickingConfig, SceneConfig};
use brainview_core::{Aabb, PartId, PartRegistry, ViewMode};

/// Positions of one part's point cloud, kept for picking
#[derive(Debug, Clone)]
pub struct CloudGeometry {
    pub positions: Vec<[f32; 3]>,
    pub bounds: Option<Aabb>,
}

/// Every loaded part, indexed by [`PartId`]
#[derive(Resource, Default)]
pub struct BrainParts {
    pub registry: PartRegistry<Entity>,
    /// Same order as the registry's parts
    pub clouds: Vec<CloudGeometry>,
    /// Bounds of the whole asset
    pub bounds: Option<Aabb>,
}

impl BrainParts {
    pub fn cloud(&self, id: PartId) -> Option<&CloudGeometry> {
        self.clouds.get(id.0)
    }

    /// Drop every part, returning the entities to despawn
    pub fn clear(&mut self) -> Vec<Entity> {
        self.clouds.clear();
        self.bounds = None;
        self.registry.clear()
    }
}

/// Current interaction mode and hover readout
#[derive(Resource, Debug, Clone, Default)]
pub struct ViewState {
    pub mode: ViewMode,
    /// Display name of the part under the pointer (hover mode)
    pub hovered_label: Option<String>,
}

/// Scene appearance, from the `[scene]` config section
#[derive(Resource, Debug, Clone, Default)]
pub struct SceneSettings(pub SceneConfig);

/// Picking parameters, from the `[picking]` config section
#[derive(Resource, Debug, Clone, Default)]
pub struct PickSettings(pub PickingConfig);

/// Point-cloud entity of a part
#[derive(Component, Debug, Clone, Copy)]
pub struct PartPoints(pub PartId);

/// Solid entity of a part
#[derive(Component, Debug, Clone, Copy)]
pub struct PartSolid(pub PartId);

/// Requests that change part display state
#[derive(Message, Debug, Clone, PartialEq)]
pub enum PartCommand {
    /// Show one display-name group solid, everything else as points
    Toggle(String),
    /// Back to all points, no solids
    Reset,
    SetMode(ViewMode),
}

/// Screen layout, switched to a compact form on narrow or portrait screens
#[derive(Resource, Debug, Clone)]
pub struct UiLayout {
    pub is_mobile: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    pub show_panel: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            is_mobile: false,
            screen_width: 1920.0,
            screen_height: 1080.0,
            show_panel: true,
        }
    }
}

impl UiLayout {
    pub fn update_from_window(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
        // Consider mobile if width < 800 or in portrait orientation
        self.is_mobile = width < 800.0 || (height > width * 1.2);
    }

    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            self.screen_width * 0.85
        } else {
            240.0
        }
    }

    pub fn ui_scale(&self) -> f32 {
        if self.is_mobile { 1.2 } else { 1.0 }
    }
}

/// Convert a region color to a Bevy color
pub fn to_color(rgb: brainview_core::Rgb) -> Color {
    Color::srgb_u8(rgb.r, rgb.g, rgb.b)
}

/// Same, with alpha
pub fn to_color_alpha(rgb: brainview_core::Rgb, alpha: f32) -> Color {
    to_color(rgb).with_alpha(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mobile_detection() {
        let mut layout = UiLayout::default();
        layout.update_from_window(1280.0, 720.0);
        assert!(!layout.is_mobile);
        assert_eq!(layout.panel_width(), 240.0);

        layout.update_from_window(400.0, 900.0);
        assert!(layout.is_mobile);
        assert_eq!(layout.panel_width(), 400.0 * 0.85);
    }

    #[test]
    fn test_color_conversion() {
        let c = to_color(brainview_core::Rgb::from_hex(0xff0000)).to_srgba();
        assert_eq!(c.red, 1.0);
        assert_eq!(c.green, 0.0);
        assert_eq!(to_color_alpha(brainview_core::Rgb::FALLBACK, 0.8).alpha(), 0.8);
    }
}
