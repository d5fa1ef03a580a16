use engine::app::rendering::TextureCache;
use engine::{resolve_app_paths, LoopConfig, ModeError, ModeKey, ModeMachine, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::context::GameContext;
use super::high_score_mode::{HighScoreMode, HIGH_SCORE_MODE};
use super::level::{LevelLibrary, LevelLoadError};
use super::main_mode::{MainMode, MAIN_MODE};
use super::settings::Settings;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) modes: ModeMachine<GameContext>,
    pub(crate) initial_mode: ModeKey,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("start level could not be loaded: {0}")]
    StartLevel(#[from] LevelLoadError),
    #[error(transparent)]
    Mode(#[from] ModeError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Trackball Startup ===");

    let paths = resolve_app_paths()?;
    let settings = Settings::from_env();
    info!(
        root = %paths.root.display(),
        difficulty = settings.difficulty.label(),
        gfx_details = ?settings.gfx_details,
        show_fps = settings.show_fps,
        start_level = %settings.start_level,
        "settings_resolved"
    );

    let mut context = GameContext::new(
        settings,
        LevelLibrary::new(&paths.level_dir),
        TextureCache::new(&paths.asset_dir),
        paths.snapshot_dir.clone(),
    );
    context.new_session()?;

    let modes = ModeMachine::new(context)
        .with_mode(MAIN_MODE, Box::new(MainMode::new()))?
        .with_mode(HIGH_SCORE_MODE, Box::new(HighScoreMode::new()))?;

    Ok(AppWiring {
        config: LoopConfig::default(),
        modes,
        initial_mode: MAIN_MODE,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
