//! Viewer configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::color::Rgb;
use crate::pick::DEFAULT_POINT_THRESHOLD;
use crate::region::{Palette, RegionEntry, RegionTable, TableError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid region table: {0}")]
    RegionError(#[from] TableError),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Failed to fetch config '{url}': {message}")]
    FetchError { url: String, message: String },
}

/// Interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Button per region, one group shown solid at a time
    #[default]
    Menu,
    /// Solid follows the point cloud under the pointer
    Hover,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Menu => "Menu",
            ViewMode::Hover => "Hover",
        }
    }
}

impl FromStr for ViewMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "menu" => Ok(ViewMode::Menu),
            "hover" => Ok(ViewMode::Hover),
            other => Err(ConfigError::InvalidValue {
                field: "mode",
                reason: format!("unknown mode '{}', expected menu or hover", other),
            }),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub asset: AssetConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub picking: PickingConfig,
    /// Replaces the built-in region table when present
    #[serde(default, rename = "region", skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<RegionEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// OBJ file, relative to the page (web) or working directory (native)
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "models/brain-parts-big.obj".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub mode: ViewMode,
    /// Color scheme; follows the mode when unset
    #[serde(default)]
    pub palette: Option<Palette>,
    /// Show the registry summary panel
    #[serde(default)]
    pub debug_panel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_background")]
    pub background: Rgb,
    #[serde(default = "default_floor_color")]
    pub floor_color: Rgb,
    #[serde(default = "default_floor_size")]
    pub floor_size: f32,
    #[serde(default = "default_floor_y")]
    pub floor_y: f32,
    /// Draw the soft shadow texture just above the floor
    #[serde(default = "default_true")]
    pub shadow_overlay: bool,
    #[serde(default = "default_shadow_texture")]
    pub shadow_texture: String,
    #[serde(default = "default_shadow_size")]
    pub shadow_size: f32,
    #[serde(default = "default_solid_opacity")]
    pub solid_opacity: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            floor_color: default_floor_color(),
            floor_size: default_floor_size(),
            floor_y: default_floor_y(),
            shadow_overlay: true,
            shadow_texture: default_shadow_texture(),
            shadow_size: default_shadow_size(),
            solid_opacity: default_solid_opacity(),
        }
    }
}

impl SceneConfig {
    /// Shadow texture to draw, if the overlay is enabled and has a texture
    pub fn shadow(&self) -> Option<&str> {
        let texture = self.shadow_texture.trim();
        (self.shadow_overlay && !texture.is_empty()).then_some(texture)
    }
}

fn default_background() -> Rgb {
    Rgb::from_hex(0x111111)
}

fn default_floor_color() -> Rgb {
    Rgb::from_hex(0x6f6f6f)
}

fn default_floor_size() -> f32 {
    410.0
}

fn default_floor_y() -> f32 {
    -200.0
}

fn default_true() -> bool {
    true
}

fn default_shadow_texture() -> String {
    "textures/brain-shadow.png".to_string()
}

fn default_shadow_size() -> f32 {
    400.0
}

fn default_solid_opacity() -> f32 {
    0.8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Initial distance from the origin along +Z
    #[serde(default = "default_distance")]
    pub distance: f32,
    /// Orbit smoothing factor per 60 Hz frame
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Radians per pixel of drag
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            distance: default_distance(),
            damping: default_damping(),
            sensitivity: default_sensitivity(),
            zoom_speed: default_zoom_speed(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
        }
    }
}

fn default_fov() -> f32 {
    45.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_distance() -> f32 {
    100.0
}

fn default_damping() -> f32 {
    0.05
}

fn default_sensitivity() -> f32 {
    0.005
}

fn default_zoom_speed() -> f32 {
    0.1
}

fn default_min_distance() -> f32 {
    5.0
}

fn default_max_distance() -> f32 {
    600.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingConfig {
    /// Max distance between ray and point, in world units
    #[serde(default = "default_point_threshold")]
    pub point_threshold: f32,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            point_threshold: default_point_threshold(),
        }
    }
}

fn default_point_threshold() -> f32 {
    DEFAULT_POINT_THRESHOLD
}

/// Finite and greater than zero
fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

impl ViewerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        positive("camera.fov_degrees", cam.fov_degrees)?;
        if cam.fov_degrees >= 180.0 {
            return Err(invalid("camera.fov_degrees", "must be below 180"));
        }
        positive("camera.near", cam.near)?;
        positive("camera.far", cam.far)?;
        if cam.far <= cam.near {
            return Err(invalid("camera.far", "must be greater than camera.near"));
        }
        positive("camera.damping", cam.damping)?;
        if cam.damping > 1.0 {
            return Err(invalid("camera.damping", "must be in (0, 1]"));
        }
        positive("camera.sensitivity", cam.sensitivity)?;
        positive("camera.zoom_speed", cam.zoom_speed)?;
        positive("camera.min_distance", cam.min_distance)?;
        positive("camera.max_distance", cam.max_distance)?;
        if cam.max_distance < cam.min_distance {
            return Err(invalid(
                "camera.max_distance",
                "must not be below camera.min_distance",
            ));
        }
        positive("camera.distance", cam.distance)?;
        if cam.distance < cam.min_distance || cam.distance > cam.max_distance {
            return Err(invalid(
                "camera.distance",
                "must lie between camera.min_distance and camera.max_distance",
            ));
        }

        positive("picking.point_threshold", self.picking.point_threshold)?;

        let scene = &self.scene;
        positive("scene.floor_size", scene.floor_size)?;
        positive("scene.shadow_size", scene.shadow_size)?;
        if !scene.floor_y.is_finite() {
            return Err(invalid("scene.floor_y", "must be a finite number"));
        }
        if !(0.0..=1.0).contains(&scene.solid_opacity) {
            return Err(invalid("scene.solid_opacity", "must be between 0 and 1"));
        }

        if let Some(regions) = &self.regions {
            self.table_from(regions)?;
        }
        Ok(())
    }

    /// Palette for a mode, unless one is pinned in the config
    pub fn palette_for(&self, mode: ViewMode) -> Palette {
        self.view.palette.unwrap_or(match mode {
            ViewMode::Menu => Palette::Menu,
            ViewMode::Hover => Palette::Hover,
        })
    }

    /// Region table to classify with: the configured one, or the built-in
    /// table in the mode's palette
    pub fn region_table(&self, mode: ViewMode) -> Result<RegionTable, ConfigError> {
        match &self.regions {
            Some(regions) => self.table_from(regions),
            None => Ok(RegionTable::builtin(self.palette_for(mode))),
        }
    }

    fn table_from(&self, regions: &[RegionEntry]) -> Result<RegionTable, ConfigError> {
        let table = RegionTable {
            version: "1.0".to_string(),
            region: regions.to_vec(),
        };
        // Round through the table parser so keys get normalized the same way
        Ok(RegionTable::from_toml(&table.to_toml()?)?)
    }
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    if path.exists() {
        let config = ViewerConfig::from_file(path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}
