use engine::app::rendering::{draw_text, line_height, Align, Frame};
use engine::{FrameInfo, GameMode, InputSnapshot, Key, ModeCommand, ModeKey};
use tracing::info;

use super::context::GameContext;
use super::main_mode::MAIN_MODE;

pub(crate) const HIGH_SCORE_MODE: ModeKey = ModeKey("high_score");

const MAX_NAME_LEN: usize = 12;
const ANONYMOUS: &str = "anonymous";
const SHOWN_SCORES: usize = 5;
const BACKGROUND: [f32; 4] = [0.05, 0.05, 0.12, 1.0];
const TEXT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const DIM_TEXT: [f32; 4] = [0.7, 0.7, 0.8, 1.0];

/// Name entry after a finished game; hands back to the main mode with a new
/// session.
#[derive(Debug, Default)]
pub(crate) struct HighScoreMode {
    name: String,
    final_score: i32,
    level: String,
}

impl HighScoreMode {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl GameMode<GameContext> for HighScoreMode {
    fn activate(&mut self, ctx: &mut GameContext) {
        self.name.clear();
        if let Some(session) = ctx.session.as_ref() {
            self.final_score = session.player.score;
            self.level = session.info().id.clone();
        }
        info!(score = self.final_score, level = %self.level, "high_score_entry_opened");
    }

    fn deactivate(&mut self, _ctx: &mut GameContext) {}

    fn tick(&mut self, _dt_seconds: f32, _input: &InputSnapshot, _ctx: &mut GameContext) -> ModeCommand {
        ModeCommand::None
    }

    fn key(&mut self, key: Key, ctx: &mut GameContext) -> ModeCommand {
        match key {
            Key::Char(ch) if ch.is_ascii_alphanumeric() => {
                if self.name.len() < MAX_NAME_LEN {
                    self.name.push(ch);
                }
            }
            Key::Backspace => {
                self.name.pop();
            }
            Key::Enter => {
                let name = if self.name.is_empty() {
                    ANONYMOUS
                } else {
                    self.name.as_str()
                };
                ctx.gamer.record_score(name, self.final_score, &self.level);
                ctx.session = None;
                return ModeCommand::SwitchTo(MAIN_MODE);
            }
            _ => {}
        }
        ModeCommand::None
    }

    fn render(&mut self, _info: &FrameInfo, ctx: &mut GameContext, frame: &mut Frame) {
        frame.clear(BACKGROUND);
        let center_x = frame.width() as i32 / 2;
        let row = line_height(2);
        let mut y = frame.height() as i32 / 6;

        draw_text(frame, center_x, y, 4, Align::Center, "High scores", TEXT);
        y += line_height(4) + row;
        draw_text(
            frame,
            center_x,
            y,
            2,
            Align::Center,
            &format!("Final score: {}", self.final_score),
            TEXT,
        );
        y += row * 2;
        draw_text(frame, center_x, y, 2, Align::Center, "Enter your name:", DIM_TEXT);
        y += row;
        draw_text(
            frame,
            center_x,
            y,
            2,
            Align::Center,
            &format!("{}_", self.name),
            TEXT,
        );
        y += row * 2;

        for (rank, entry) in ctx.gamer.high_scores().iter().take(SHOWN_SCORES).enumerate() {
            draw_text(
                frame,
                center_x - 8,
                y,
                2,
                Align::Right,
                &format!("{}. {}", rank + 1, entry.name),
                DIM_TEXT,
            );
            draw_text(
                frame,
                center_x + 8,
                y,
                2,
                Align::Left,
                &format!("{} ({})", entry.score, entry.level),
                DIM_TEXT,
            );
            y += row;
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::app::rendering::TextureCache;

    use super::*;
    use crate::app::level::LevelLibrary;
    use crate::app::settings::Settings;

    fn context(dir: &std::path::Path) -> GameContext {
        let mut ctx = GameContext::new(
            Settings::default(),
            LevelLibrary::builtin(),
            TextureCache::new(dir),
            dir.to_path_buf(),
        );
        ctx.new_session().expect("session");
        ctx
    }

    #[test]
    fn typed_name_is_recorded_and_session_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(dir.path());
        if let Some(session) = ctx.session.as_mut() {
            session.player.score = 1234;
        }
        let mut mode = HighScoreMode::new();
        mode.activate(&mut ctx);
        for key in [Key::Char('a'), Key::Char('x'), Key::Backspace, Key::Char('l')] {
            assert_eq!(mode.key(key, &mut ctx), ModeCommand::None);
        }
        assert_eq!(mode.name(), "al");
        assert_eq!(mode.key(Key::Enter, &mut ctx), ModeCommand::SwitchTo(MAIN_MODE));
        assert!(ctx.session.is_none());
        let best = &ctx.gamer.high_scores()[0];
        assert_eq!((best.name.as_str(), best.score, best.level.as_str()), ("al", 1234, "lv1"));
    }

    #[test]
    fn names_are_limited_to_alphanumerics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(dir.path());
        let mut mode = HighScoreMode::new();
        mode.activate(&mut ctx);
        for _ in 0..20 {
            mode.key(Key::Char('z'), &mut ctx);
        }
        mode.key(Key::Char('!'), &mut ctx);
        mode.key(Key::SPACE, &mut ctx);
        assert_eq!(mode.name().len(), MAX_NAME_LEN);
        assert!(mode.name().chars().all(|ch| ch == 'z'));
    }

    #[test]
    fn empty_name_is_recorded_as_anonymous() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(dir.path());
        let mut mode = HighScoreMode::new();
        mode.activate(&mut ctx);
        mode.key(Key::Enter, &mut ctx);
        assert_eq!(ctx.gamer.high_scores()[0].name, ANONYMOUS);
    }
}
