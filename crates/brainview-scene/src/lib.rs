//! Brainview Scene - Bevy plugins for the brain viewer
//!
//! This crate provides the 3D side of the viewer: orbit camera, lights and
//! floor, point-cloud and solid entities for every part, hover picking, and
//! the egui widgets the application builds its panels from.

pub mod camera;
pub mod hover;
pub mod parts;
pub mod scene;
pub mod types;
pub mod ui;

use bevy::prelude::*;

/// Plugin that sets up the shared 3D scene components
pub struct BrainScenePlugin;

impl Plugin for BrainScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(parts::PartsPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(hover::HoverPlugin);
    }
}

// Re-export commonly used types
pub use camera::{CameraSettings, MainCamera};
pub use parts::spawn_asset;
pub use types::*;
