use std::path::PathBuf;

use engine::app::rendering::TextureCache;
use tracing::info;

use super::gamer::Gamer;
use super::level::{LevelLibrary, LevelLoadError};
use super::session::GameSession;
use super::settings::Settings;

/// State shared by every mode: settings, assets, the gamer and the running
/// session, if any.
#[derive(Debug)]
pub(crate) struct GameContext {
    pub(crate) settings: Settings,
    pub(crate) levels: LevelLibrary,
    pub(crate) textures: TextureCache,
    pub(crate) gamer: Gamer,
    pub(crate) session: Option<GameSession>,
    pub(crate) snapshot_dir: PathBuf,
}

impl GameContext {
    pub(crate) fn new(
        settings: Settings,
        levels: LevelLibrary,
        textures: TextureCache,
        snapshot_dir: PathBuf,
    ) -> Self {
        Self {
            settings,
            levels,
            textures,
            gamer: Gamer::default(),
            session: None,
            snapshot_dir,
        }
    }

    /// Replaces any running session with a fresh one on the start level.
    pub(crate) fn new_session(&mut self) -> Result<(), LevelLoadError> {
        let level = self.levels.load(&self.settings.start_level)?;
        info!(
            level = %level.info.id,
            difficulty = self.settings.difficulty.label(),
            "session_started"
        );
        self.session = Some(GameSession::new(level, self.settings.difficulty));
        Ok(())
    }
}
