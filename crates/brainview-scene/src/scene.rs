//! Scene setup - lights, floor and shadow overlay

use bevy::prelude::*;
use brainview_core::ViewMode;

use crate::types::{to_color, SceneSettings, ViewState};

/// Light used by the menu view
#[derive(Component)]
pub struct MenuLight;

/// Light used by the hover view
#[derive(Component)]
pub struct HoverLight;

/// Marker for the floor plane
#[derive(Component)]
pub struct Floor;

/// Marker for the soft shadow drawn on the floor
#[derive(Component)]
pub struct ShadowOverlay;

/// Ambient brightness for each mode
const MENU_AMBIENT: f32 = 80.0;
const HOVER_AMBIENT: f32 = 320.0;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneSettings>()
            .add_systems(Startup, setup_lights)
            .add_systems(Update, (apply_scene_settings, apply_mode_lighting));
    }
}

fn setup_lights(mut commands: Commands, view: Res<ViewState>) {
    let menu_visibility = visibility_for(view.mode == ViewMode::Menu);
    let hover_visibility = visibility_for(view.mode == ViewMode::Hover);

    // Menu view: key light in front, rim light behind
    commands.spawn((
        DirectionalLight {
            illuminance: 4000.0,
            ..default()
        },
        Transform::from_xyz(30.0, 10.0, 100.0).looking_at(Vec3::ZERO, Vec3::Y),
        MenuLight,
        menu_visibility,
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 4000.0,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, -100.0).looking_at(Vec3::ZERO, Vec3::Y),
        MenuLight,
        menu_visibility,
    ));

    // Hover view: one brighter light from above right
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            ..default()
        },
        Transform::from_xyz(10.0, 10.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
        HoverLight,
        hover_visibility,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: ambient_for(view.mode),
        ..default()
    });
}

/// (Re)build background, floor and shadow whenever the scene settings change
fn apply_scene_settings(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    settings: Res<SceneSettings>,
    existing: Query<Entity, Or<(With<Floor>, With<ShadowOverlay>)>>,
) {
    if !settings.is_changed() {
        return;
    }

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let config = &settings.0;
    commands.insert_resource(ClearColor(to_color(config.background)));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(config.floor_size, config.floor_size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: to_color(config.floor_color),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, config.floor_y, 0.0),
        Floor,
    ));

    if let Some(texture) = config.shadow() {
        commands.spawn((
            Mesh3d(meshes.add(Plane3d::default().mesh().size(config.shadow_size, config.shadow_size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color_texture: Some(asset_server.load(texture.to_string())),
                unlit: true,
                alpha_mode: AlphaMode::Blend,
                ..default()
            })),
            Transform::from_xyz(0.0, config.floor_y + 1.0, 0.0),
            ShadowOverlay,
        ));
    }
}

fn visibility_for(on: bool) -> Visibility {
    if on {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn ambient_for(mode: ViewMode) -> f32 {
    match mode {
        ViewMode::Menu => MENU_AMBIENT,
        ViewMode::Hover => HOVER_AMBIENT,
    }
}

/// Swap light rigs when the mode changes
fn apply_mode_lighting(
    view: Res<ViewState>,
    mut ambient: ResMut<AmbientLight>,
    mut menu_lights: Query<&mut Visibility, (With<MenuLight>, Without<HoverLight>)>,
    mut hover_lights: Query<&mut Visibility, (With<HoverLight>, Without<MenuLight>)>,
) {
    if !view.is_changed() {
        return;
    }

    for mut visibility in menu_lights.iter_mut() {
        *visibility = visibility_for(view.mode == ViewMode::Menu);
    }
    for mut visibility in hover_lights.iter_mut() {
        *visibility = visibility_for(view.mode == ViewMode::Hover);
    }
    ambient.brightness = ambient_for(view.mode);
}
