pub mod app;
pub mod error;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod time;

use std::path::Path;

use winit::event_loop::EventLoop;

use app::App;
use error::StartupError;
use scene::{SceneBatch, SkyboxFaces};
use settings::AppConfig;

pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Loads the configuration and scene, then drives the window until it is
/// closed. Every startup failure is returned instead of aborting.
pub fn run<P: AsRef<Path>>(config_path: P) -> Result<(), StartupError> {
    init_logging();

    let config_path = config_path.as_ref();
    log::info!("Loading configuration from {:?}", config_path);
    let mut config = AppConfig::load_from_path(config_path)?;

    // Relative asset paths are taken from the config file's directory.
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));
    config.scene.directory = base.join(&config.scene.directory);

    let batch = SceneBatch::load(&config.scene)?;
    let sky = SkyboxFaces::load(base, &config.skybox.faces);

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, batch, sky);
    event_loop.run_app(&mut app)?;

    log::info!("Application shutdown complete");
    app.into_result()
}
