//! Light-Field Viewer
//!
//! Usage: `lightfield-viewer [SETTINGS.xml]`
//!
//! Loads every asset first; any load failure is fatal and no window is opened.

use std::path::Path;
use std::process::ExitCode;

use winit::event_loop::EventLoop;

use lightfield_viewer::render::window_attributes;
use lightfield_viewer::telemetry::{init_logging, LogConfig};
use lightfield_viewer::{
    LayerCompositor, LoadedAssets, RenderDriver, ResourceFetcher, ViewerSettings,
};

fn main() -> ExitCode {
    let log_config = LogConfig::default();
    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("Light-Field Viewer v{}", env!("CARGO_PKG_VERSION"));

    let settings = match std::env::args_os().nth(1) {
        Some(path) => match ViewerSettings::load_from_file(Path::new(&path)) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", Path::new(&path).display());
                settings
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load settings from {}: {}",
                    Path::new(&path).display(),
                    e
                );
                return ExitCode::FAILURE;
            }
        },
        None => ViewerSettings::default(),
    };

    let assets = match load_assets(&settings) {
        Ok(assets) => assets,
        Err(e) => {
            tracing::error!("Failed to load light-field assets: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let scene = LayerCompositor::from_assets(assets);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (driver, _handle) = RenderDriver::attach(window_attributes(&settings), scene);
    match driver.run(event_loop) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Viewer stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Fetch the atlas and all layer meshes on a single-threaded runtime
fn load_assets(settings: &ViewerSettings) -> Result<LoadedAssets, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let fetcher = ResourceFetcher::from_settings(settings)?;
    Ok(runtime.block_on(fetcher.load_all())?)
}
