//! Brainview Viewer - interactive anatomical brain viewer
//!
//! Loads a brain model made of named sub-meshes, groups the parts into
//! anatomical regions and lets the user explore them, either by picking a
//! region from a menu or by pointing at the model.

pub mod app;
pub mod asset_loader;
mod ui;

pub use app::{run, run_with, LaunchOptions};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// WASM entry point
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run();
}
