//! Camera controls and orbit navigation

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use brainview_core::config::CameraConfig;

/// Orbit camera state. Y is up; azimuth 0 and elevation 0 look down -Z.
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub target_azimuth: f32,
    pub elevation: f32,
    pub target_elevation: f32,
    pub target: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl CameraSettings {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            distance: config.distance,
            target_distance: config.distance,
            azimuth: 0.0,
            target_azimuth: 0.0,
            elevation: 0.0,
            target_elevation: 0.0,
            target: Vec3::ZERO,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            smooth_factor: config.damping,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
        }
    }

    /// Camera position for the current angles and distance
    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.elevation.cos() * self.azimuth.sin(),
            self.elevation.sin(),
            self.elevation.cos() * self.azimuth.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn projection(&self) -> Projection {
        Projection::Perspective(PerspectiveProjection {
            fov: self.fov_degrees.to_radians(),
            near: self.near,
            far: self.far,
            ..default()
        })
    }

    /// Move current values toward their targets, frame-rate independent
    pub fn step(&mut self, dt: f32) {
        let lerp_factor = 1.0 - (-self.smooth_factor * 60.0 * dt).exp();
        self.distance += (self.target_distance - self.distance) * lerp_factor;
        self.azimuth += (self.target_azimuth - self.azimuth) * lerp_factor;
        self.elevation += (self.target_elevation - self.elevation) * lerp_factor;
    }

    pub fn zoom(&mut self, factor: f32) {
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.target_azimuth -= delta.x * self.sensitivity;
        self.target_elevation =
            (self.target_elevation + delta.y * self.sensitivity).clamp(-1.5, 1.5);
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, update_camera);
    }
}

fn spawn_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3d::default(),
        settings.projection(),
        Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y),
        MainCamera,
    ));
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: EguiContexts,
) {
    // Leave the pointer to egui when it is over a panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.orbit(total_motion);
    }

    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed;
            settings.zoom(zoom_factor.max(0.1));
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Single finger orbits
    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.orbit(delta);
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            settings.zoom(prev_dist / curr_dist.max(1.0));
        }
    }

    settings.step(time.delta_secs());

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}
