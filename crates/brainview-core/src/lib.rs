//! Brainview Core - Region classification, part registry and picking
//!
//! This crate holds the engine-free logic of the brain viewer:
//! - Region table mapping sub-mesh names to anatomical regions and colors
//! - Part registry grouping sub-meshes by display name, with menu toggle and
//!   hover selection
//! - OBJ asset parsing into named sub-meshes
//! - Ray vs point-cloud picking
//! - Viewer configuration

pub mod asset;
pub mod color;
pub mod config;
pub mod pick;
pub mod region;
pub mod registry;

pub use asset::{parse_obj, AssetError, LoadedAsset, SubMesh};
pub use color::{ColorParseError, Rgb};
pub use config::{load_config, ConfigError, ViewMode, ViewerConfig};
pub use pick::{pick_nearest, Aabb, PointCloud, PointHit, Ray, DEFAULT_POINT_THRESHOLD};
pub use region::{Classification, MatchKind, Palette, RegionEntry, RegionTable, TableError};
pub use registry::{PartEntry, PartGroup, PartId, PartRegistry, RegistryError, RegistrySummary};
