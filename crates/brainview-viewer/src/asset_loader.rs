//! Brain model loading from URL, local file upload or disk
//!
//! Fetches run outside the ECS and drop their results into [`PendingLoad`].
//! A system drains those slots once per frame and turns each finished load
//! into exactly one [`AssetLoadComplete`] message.

use bevy::prelude::*;
use brainview_core::{AssetError, ConfigError, LoadedAsset, RegionTable, ViewerConfig};
use brainview_scene::{
    spawn_asset, BrainParts, CameraSettings, MainCamera, PickSettings, SceneSettings, ViewState,
};
use std::sync::{Arc, Mutex};

use crate::app::{ActiveConfig, LaunchOptions};

/// Plugin for brain model loading
pub struct AssetLoaderPlugin;

impl Plugin for AssetLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingLoad>()
            .init_resource::<LoadStatus>()
            .add_message::<AssetLoadComplete>()
            .add_systems(Startup, start_initial_load)
            .add_systems(
                Update,
                (apply_fetched_config, drain_pending_asset, apply_loaded_asset).chain(),
            );
    }
}

/// Outcome of one model load
#[derive(Message, Debug)]
pub struct AssetLoadComplete {
    /// URL, path or file name the model came from
    pub source: String,
    pub result: Result<LoadedAsset, AssetError>,
}

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Results deposited by in-flight loads
#[derive(Resource, Default, Clone)]
pub struct PendingLoad {
    pub config: Slot<(String, Result<ViewerConfig, ConfigError>)>,
    pub asset: Slot<(String, Result<LoadedAsset, AssetError>)>,
    /// Source of a load that began outside the ECS (file upload)
    pub started: Slot<String>,
}

impl PendingLoad {
    pub fn put_config(&self, source: String, result: Result<ViewerConfig, ConfigError>) {
        if let Ok(mut slot) = self.config.lock() {
            *slot = Some((source, result));
        }
    }

    pub fn put_asset(&self, source: String, result: Result<LoadedAsset, AssetError>) {
        if let Ok(mut slot) = self.asset.lock() {
            *slot = Some((source, result));
        }
    }

    pub fn put_started(&self, source: String) {
        if let Ok(mut slot) = self.started.lock() {
            *slot = Some(source);
        }
    }

    pub fn take_started(&self) -> Option<String> {
        self.started.try_lock().ok().and_then(|mut slot| slot.take())
    }

    /// Take a finished config load, if any. Never blocks.
    pub fn take_config(&self) -> Option<(String, Result<ViewerConfig, ConfigError>)> {
        self.config.try_lock().ok().and_then(|mut slot| slot.take())
    }

    /// Take a finished model load, if any. Never blocks.
    pub fn take_asset(&self) -> Option<(String, Result<LoadedAsset, AssetError>)> {
        self.asset.try_lock().ok().and_then(|mut slot| slot.take())
    }
}

/// What the status line shows
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading {
        source: String,
    },
    Loaded {
        source: String,
        parts: usize,
        groups: usize,
    },
    Failed {
        source: String,
        message: String,
    },
}

impl LoadStatus {
    pub fn describe(&self) -> String {
        match self {
            LoadStatus::Idle => "No model loaded".to_string(),
            LoadStatus::Loading { source } => format!("Loading {}...", source),
            LoadStatus::Loaded {
                parts, groups, ..
            } => format!("{} parts in {} regions", parts, groups),
            LoadStatus::Failed { message, .. } => format!("Load failed: {}", message),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading { .. })
    }
}

fn start_initial_load(
    options: Res<LaunchOptions>,
    config: Res<ActiveConfig>,
    pending: Res<PendingLoad>,
    mut status: ResMut<LoadStatus>,
) {
    let model = options.model_or(&config.0);
    *status = LoadStatus::Loading {
        source: model.clone(),
    };
    platform::start_load(
        options.config.clone(),
        options.model.clone(),
        config.0.asset.model.clone(),
        pending.clone(),
    );
}

/// Apply a config that arrived after startup
fn apply_fetched_config(
    pending: Res<PendingLoad>,
    options: Res<LaunchOptions>,
    mut active: ResMut<ActiveConfig>,
    mut camera: ResMut<CameraSettings>,
    mut scene: ResMut<SceneSettings>,
    mut pick: ResMut<PickSettings>,
    mut view: ResMut<ViewState>,
    mut projections: Query<&mut Projection, With<MainCamera>>,
) {
    let Some((source, result)) = pending.take_config() else {
        return;
    };

    let config = match result {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(source = %source, error = %e, "Invalid configuration, using defaults");
            return;
        }
    };

    tracing::info!(source = %source, "Loaded configuration");

    *camera = CameraSettings::from_config(&config.camera);
    for mut projection in projections.iter_mut() {
        *projection = camera.projection();
    }
    scene.0 = config.scene.clone();
    pick.0 = config.picking.clone();
    view.mode = options.mode_or(&config);
    active.0 = config;
}

fn drain_pending_asset(
    pending: Res<PendingLoad>,
    mut status: ResMut<LoadStatus>,
    mut complete: MessageWriter<AssetLoadComplete>,
) {
    if let Some(source) = pending.take_started() {
        *status = LoadStatus::Loading { source };
    }
    if let Some((source, result)) = pending.take_asset() {
        complete.write(AssetLoadComplete { source, result });
    }
}

/// Populate the registry on success; leave it alone on failure
fn apply_loaded_asset(
    mut loads: MessageReader<AssetLoadComplete>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut parts: ResMut<BrainParts>,
    mut view: ResMut<ViewState>,
    mut status: ResMut<LoadStatus>,
    config: Res<ActiveConfig>,
    scene: Res<SceneSettings>,
) {
    for load in loads.read() {
        match &load.result {
            Ok(asset) => {
                let table = region_table(&config.0, view.mode);
                spawn_asset(
                    &mut commands,
                    &mut meshes,
                    &mut materials,
                    &mut parts,
                    asset,
                    &table,
                    &scene,
                );
                view.hovered_label = None;
                *status = LoadStatus::Loaded {
                    source: load.source.clone(),
                    parts: parts.registry.len(),
                    groups: parts.registry.groups().len(),
                };
            }
            Err(e) => {
                tracing::error!(source = %load.source, error = %e, "Failed to load brain model");
                *status = LoadStatus::Failed {
                    source: load.source.clone(),
                    message: e.to_string(),
                };
            }
        }
    }
}

/// Turn the outcome of reading a picked file into a load result. `Ok(None)`
/// means the reader produced something other than text.
pub fn file_text_result(
    filename: &str,
    text: Result<Option<String>, String>,
) -> Result<LoadedAsset, AssetError> {
    let read_error = |message: String| AssetError::FetchError {
        url: filename.to_string(),
        message,
    };
    match text {
        Ok(Some(text)) => brainview_core::parse_obj(filename, &text),
        Ok(None) => Err(read_error("File is not text".to_string())),
        Err(message) => Err(read_error(message)),
    }
}

/// Configured table, or the built-in one if the configured table is unusable
fn region_table(config: &ViewerConfig, mode: brainview_core::ViewMode) -> RegionTable {
    config.region_table(mode).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to built-in region table");
        RegionTable::builtin(config.palette_for(mode))
    })
}

#[cfg(target_arch = "wasm32")]
mod platform {
    use super::{file_text_result, PendingLoad};
    use brainview_core::{parse_obj, AssetError, ConfigError, ViewerConfig};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{FileReader, HtmlInputElement};

    /// Fetch the optional config, then the model, in one task so the model
    /// path from the config is honored
    pub fn start_load(
        config_url: Option<String>,
        model: Option<String>,
        default_model: String,
        pending: PendingLoad,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            let mut model = model;

            if let Some(url) = config_url {
                tracing::info!("Loading configuration from {}", url);
                let result = match fetch_text(&url).await {
                    Ok(text) => ViewerConfig::from_toml(&text),
                    Err(e) => Err(ConfigError::FetchError {
                        url: url.clone(),
                        message: e.to_string(),
                    }),
                };
                if let Ok(config) = &result {
                    model.get_or_insert_with(|| config.asset.model.clone());
                }
                pending.put_config(url, result);
            }

            let model = model.unwrap_or(default_model);
            tracing::info!("Loading brain model from {}", model);
            let result = match fetch_text(&model).await {
                Ok(text) => parse_obj(&model, &text),
                Err(e) => Err(e),
            };
            pending.put_asset(model, result);
        });
    }

    fn js_message(value: &JsValue) -> String {
        value
            .dyn_ref::<js_sys::Error>()
            .map(|e| String::from(e.message()))
            .or_else(|| value.as_string())
            .unwrap_or_else(|| format!("{:?}", value))
    }

    /// Fetch a text resource relative to the page
    async fn fetch_text(url: &str) -> Result<String, AssetError> {
        let fetch_error = |message: String| AssetError::FetchError {
            url: url.to_string(),
            message,
        };

        let window = web_sys::window().ok_or_else(|| fetch_error("No window".into()))?;

        let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| fetch_error(js_message(&e)))?;

        let resp: web_sys::Response = resp
            .dyn_into()
            .map_err(|_| fetch_error("Response cast failed".into()))?;

        if !resp.ok() {
            return Err(AssetError::HttpStatus {
                url: url.to_string(),
                status: resp.status(),
            });
        }

        let text = resp.text().map_err(|e| fetch_error(js_message(&e)))?;
        let text = wasm_bindgen_futures::JsFuture::from(text)
            .await
            .map_err(|e| fetch_error(js_message(&e)))?;

        text.as_string()
            .ok_or_else(|| fetch_error("Response body is not text".into()))
    }

    /// Let the user pick a local OBJ file; the result lands in `pending`
    pub fn open_file_picker(pending: &PendingLoad) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .map(|el| el.dyn_into::<HtmlInputElement>())
        {
            Ok(Ok(input)) => input,
            _ => {
                tracing::error!("open_file_picker: failed to create file input");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(".obj");

        // Hide the input element but keep it in the DOM
        let _ = input.style().set_property("display", "none");

        // Append to body - required for click() to work in many browsers
        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input: {}", js_message(&e));
            return;
        }

        let pending = pending.clone();
        let input_for_removal = input.clone();

        let on_change = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(input) = event
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };

            // Remove the input from DOM after use
            if let Some(parent) = input_for_removal.parent_node() {
                let _ = parent.remove_child(&input_for_removal);
            }

            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let filename = file.name();
            tracing::info!("File selected: {}", filename);
            pending.put_started(filename.clone());

            let reader = match FileReader::new() {
                Ok(r) => r,
                Err(e) => {
                    pending.put_asset(
                        filename.clone(),
                        file_text_result(&filename, Err(js_message(&e))),
                    );
                    return;
                }
            };

            let on_load = {
                let pending = pending.clone();
                let filename = filename.clone();
                Closure::wrap(Box::new(move |event: web_sys::Event| {
                    let text = event
                        .target()
                        .and_then(|t| t.dyn_into::<FileReader>().ok())
                        .ok_or_else(|| "FileReader missing from load event".to_string())
                        .and_then(|reader| reader.result().map_err(|e| js_message(&e)))
                        .map(|value| value.as_string());
                    pending.put_asset(filename.clone(), file_text_result(&filename, text));
                }) as Box<dyn FnMut(_)>)
            };

            let on_error = {
                let pending = pending.clone();
                let filename = filename.clone();
                Closure::wrap(Box::new(move |event: web_sys::Event| {
                    let message = event
                        .target()
                        .and_then(|t| t.dyn_into::<FileReader>().ok())
                        .and_then(|reader| reader.error())
                        .map(|e| String::from(e.message()))
                        .unwrap_or_else(|| "File could not be read".to_string());
                    pending.put_asset(filename.clone(), file_text_result(&filename, Err(message)));
                }) as Box<dyn FnMut(_)>)
            };

            reader.set_onload(Some(on_load.as_ref().unchecked_ref()));
            reader.set_onerror(Some(on_error.as_ref().unchecked_ref()));
            on_load.forget();
            on_error.forget();

            if let Err(e) = reader.read_as_text(&file) {
                pending.put_asset(
                    filename.clone(),
                    file_text_result(&filename, Err(js_message(&e))),
                );
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(on_change.as_ref().unchecked_ref()));
        on_change.forget();

        input.click();
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod platform {
    use super::PendingLoad;
    use brainview_core::LoadedAsset;
    use std::path::Path;

    /// Read the model synchronously; the config was already read by `main`
    pub fn start_load(
        _config_url: Option<String>,
        model: Option<String>,
        default_model: String,
        pending: PendingLoad,
    ) {
        let model = model.unwrap_or(default_model);
        tracing::info!("Loading brain model from {}", model);
        let result = LoadedAsset::from_file(Path::new(&model));
        pending.put_asset(model, result);
    }
}

#[cfg(target_arch = "wasm32")]
pub use platform::open_file_picker;

#[cfg(test)]
mod tests {
    use super::*;
    use brainview_core::parse_obj;
    use brainview_scene::parts::PartsPlugin;

    const OBJ: &str = "o frontal1\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no stem1\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n";

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(AssetPlugin::default())
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_resource::<SceneSettings>()
            .init_resource::<PickSettings>()
            .init_resource::<CameraSettings>()
            .init_resource::<ActiveConfig>()
            .init_resource::<LaunchOptions>()
            .init_resource::<PendingLoad>()
            .init_resource::<LoadStatus>()
            .add_plugins(PartsPlugin)
            .add_message::<AssetLoadComplete>()
            .add_systems(
                Update,
                (apply_fetched_config, drain_pending_asset, apply_loaded_asset).chain(),
            );
        app
    }

    #[derive(Resource, Default)]
    struct Completions(usize);

    fn count_completions(mut loads: MessageReader<AssetLoadComplete>, mut count: ResMut<Completions>) {
        count.0 += loads.read().count();
    }

    #[test]
    fn test_single_completion_message() {
        let mut app = test_app();
        app.init_resource::<Completions>()
            .add_systems(Update, count_completions.after(drain_pending_asset));

        let pending = app.world().resource::<PendingLoad>().clone();
        pending.put_asset("brain.obj".into(), parse_obj("brain.obj", OBJ));

        app.update();
        app.update();
        app.update();
        assert_eq!(app.world().resource::<Completions>().0, 1);
    }

    #[test]
    fn test_success_populates_registry() {
        let mut app = test_app();
        let pending = app.world().resource::<PendingLoad>().clone();
        pending.put_asset("brain.obj".into(), parse_obj("brain.obj", OBJ));
        app.update();

        let parts = app.world().resource::<BrainParts>();
        assert_eq!(parts.registry.len(), 2);
        let groups: Vec<_> = parts.registry.group_names().collect();
        assert_eq!(groups, vec!["Frontal Lobe", "Brainstem"]);
        assert_eq!(
            *app.world().resource::<LoadStatus>(),
            LoadStatus::Loaded {
                source: "brain.obj".into(),
                parts: 2,
                groups: 2
            }
        );
    }

    #[test]
    fn test_failure_leaves_registry() {
        let mut app = test_app();
        let pending = app.world().resource::<PendingLoad>().clone();
        pending.put_asset("brain.obj".into(), parse_obj("brain.obj", OBJ));
        app.update();

        pending.put_asset(
            "missing.obj".into(),
            Err(AssetError::HttpStatus {
                url: "missing.obj".into(),
                status: 404,
            }),
        );
        app.update();

        assert_eq!(app.world().resource::<BrainParts>().registry.len(), 2);
        match app.world().resource::<LoadStatus>() {
            LoadStatus::Failed { source, message } => {
                assert_eq!(source, "missing.obj");
                assert!(message.contains("404"));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_fetched_config_applied() {
        let mut app = test_app();
        let pending = app.world().resource::<PendingLoad>().clone();
        let config = ViewerConfig::from_toml("[view]\nmode = \"hover\"\n[picking]\npoint_threshold = 3.0\n");
        pending.put_config("brainview.toml".into(), config);
        app.update();

        assert_eq!(
            app.world().resource::<ViewState>().mode,
            brainview_core::ViewMode::Hover
        );
        assert_eq!(app.world().resource::<PickSettings>().0.point_threshold, 3.0);
    }

    #[test]
    fn test_bad_config_keeps_defaults() {
        let mut app = test_app();
        let pending = app.world().resource::<PendingLoad>().clone();
        pending.put_config(
            "brainview.toml".into(),
            ViewerConfig::from_toml("[picking]\npoint_threshold = -1.0\n"),
        );
        app.update();

        assert_eq!(app.world().resource::<PickSettings>().0.point_threshold, 1.0);
    }

    #[test]
    fn test_file_read_failure_completes_once() {
        let mut app = test_app();
        app.init_resource::<Completions>()
            .add_systems(Update, count_completions.after(drain_pending_asset));

        let pending = app.world().resource::<PendingLoad>().clone();
        pending.put_started("brain.obj".into());
        app.update();
        assert!(app.world().resource::<LoadStatus>().is_loading());

        pending.put_asset(
            "brain.obj".into(),
            file_text_result("brain.obj", Err("NotReadableError".into())),
        );
        app.update();
        app.update();

        assert_eq!(app.world().resource::<Completions>().0, 1);
        match app.world().resource::<LoadStatus>() {
            LoadStatus::Failed { source, message } => {
                assert_eq!(source, "brain.obj");
                assert!(message.contains("NotReadableError"));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_file_text_result() {
        let asset = file_text_result("brain.obj", Ok(Some(OBJ.to_string()))).unwrap();
        assert_eq!(asset.source, "brain.obj");
        assert_eq!(asset.meshes.len(), 2);

        assert!(matches!(
            file_text_result("brain.obj", Ok(None)),
            Err(AssetError::FetchError { .. })
        ));
        assert!(matches!(
            file_text_result("brain.obj", Err("aborted".into())),
            Err(AssetError::FetchError { ref message, .. }) if message == "aborted"
        ));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(LoadStatus::Idle.describe(), "No model loaded");
        assert!(LoadStatus::Loading { source: "a.obj".into() }.is_loading());
        assert_eq!(
            LoadStatus::Loaded {
                source: "a.obj".into(),
                parts: 12,
                groups: 8
            }
            .describe(),
            "12 parts in 8 regions"
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("brain.obj");
        std::fs::write(&path, OBJ).unwrap();

        let pending = PendingLoad::default();
        platform::start_load(
            None,
            Some(path.display().to_string()),
            "unused.obj".into(),
            pending.clone(),
        );

        let (source, result) = pending.take_asset().unwrap();
        assert_eq!(source, path.display().to_string());
        assert_eq!(result.unwrap().meshes.len(), 2);
        assert!(pending.take_asset().is_none());
    }
}
