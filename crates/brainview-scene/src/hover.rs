//! Hover picking - show the solid of the point cloud under the pointer

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use brainview_core::{pick_nearest, PartId, PointCloud, Ray, ViewMode};
use tracing::debug;

use crate::camera::MainCamera;
use crate::types::{BrainParts, PickSettings, ViewState};

/// Plugin for hover picking
pub struct HoverPlugin;

impl Plugin for HoverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PickSettings>()
            .add_systems(Update, hover_pick);
    }
}

/// Nearest part whose points lie within `threshold` of the ray
pub fn pick_part(parts: &BrainParts, ray: &Ray, threshold: f32) -> Option<PartId> {
    // Whole-asset broad phase
    if let Some(bounds) = parts.bounds {
        bounds.inflate(threshold).intersect_ray(ray)?;
    }

    let clouds = parts
        .registry
        .parts()
        .iter()
        .filter(|p| p.points_visible)
        .filter_map(|p| {
            let cloud = parts.cloud(p.id)?;
            let view = PointCloud::new(p.id, &cloud.positions);
            Some(match cloud.bounds {
                Some(bounds) => view.with_bounds(bounds),
                None => view,
            })
        });

    pick_nearest(ray, clouds, threshold).map(|hit| hit.part)
}

fn hover_pick(
    mut parts: ResMut<BrainParts>,
    mut view: ResMut<ViewState>,
    settings: Res<PickSettings>,
    windows: Query<&Window>,
    touches: Res<Touches>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut contexts: EguiContexts,
) {
    if view.mode != ViewMode::Hover || parts.registry.is_empty() {
        return;
    }

    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);
    if egui_wants_pointer {
        // Pointer left the model for a panel
        if parts.registry.hovered_part().is_some() {
            set_hovered(&mut parts, &mut view, None);
        }
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    // Mouse first, then the first active touch
    let pointer = window
        .cursor_position()
        .or_else(|| touches.iter().next().map(|t| t.position()));

    let hit = pointer
        .and_then(|pos| camera.viewport_to_world(camera_transform, pos).ok())
        .and_then(|ray| Ray::new(ray.origin, ray.direction.as_vec3()))
        .and_then(|ray| pick_part(&parts, &ray, settings.0.point_threshold));

    // Only touch the resources on change so visibility sync stays idle
    if hit != parts.registry.hovered_part() {
        set_hovered(&mut parts, &mut view, hit);
    }
}

/// Show the solid of `hit` and update the label. Does nothing when the
/// hovered part is unchanged.
pub fn set_hovered(parts: &mut BrainParts, view: &mut ViewState, hit: Option<PartId>) {
    if hit == parts.registry.hovered_part() {
        return;
    }

    // An id from the registry's own parts is always valid
    if parts.registry.hover_select_part(hit).is_err() {
        return;
    }

    let label = hit
        .and_then(|id| parts.registry.get(id))
        .map(|p| p.display_name.clone());
    debug!(part = ?hit, label = ?label, "Hover changed");
    view.hovered_label = label;
}
