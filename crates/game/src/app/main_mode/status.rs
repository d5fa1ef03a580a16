use engine::app::rendering::Frame;
use engine::{FrameInfo, InputSnapshot, Key, ModeCommand};
use tracing::info;

use super::hud;
use super::pause::PauseTick;
use super::tally::bonus_lines;
use super::MainMode;
use crate::app::context::GameContext;
use crate::app::high_score_mode::HIGH_SCORE_MODE;
use crate::app::session::SoundEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameStatus {
    /// Orbiting the start, waiting for the first key.
    BeforeGame,
    GameOver,
    InGame,
    /// The ball was lost but lives remain.
    RestartPlayer,
    NextLevel,
    Victory,
    LevelComplete,
    BonusLevelComplete,
    Paused,
}

impl GameStatus {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::BeforeGame => "before_game",
            Self::GameOver => "game_over",
            Self::InGame => "in_game",
            Self::RestartPlayer => "restart_player",
            Self::NextLevel => "next_level",
            Self::Victory => "victory",
            Self::LevelComplete => "level_complete",
            Self::BonusLevelComplete => "bonus_level_complete",
            Self::Paused => "paused",
        }
    }
}

impl MainMode {
    pub(super) fn set_status(&mut self, next: GameStatus) {
        if self.status != next {
            info!(from = self.status.label(), to = next.label(), "status_changed");
            self.status = next;
        }
    }

    pub(super) fn on_tick(&mut self, dt: f32, input: &InputSnapshot, ctx: &mut GameContext) {
        self.camera.advance_clock(dt);
        match self.status {
            GameStatus::InGame | GameStatus::NextLevel => self.advance_play(dt, input, ctx),
            GameStatus::LevelComplete => self.tick_level_complete(dt, input, ctx),
            GameStatus::Paused => self.tick_paused(dt),
            GameStatus::GameOver | GameStatus::RestartPlayer => self.tick_unattended(dt, ctx),
            GameStatus::BeforeGame | GameStatus::Victory | GameStatus::BonusLevelComplete => {}
        }
    }

    /// The world keeps running behind the "Oops" and "Game over" screens,
    /// with no steering and no reaction to its events.
    fn tick_unattended(&mut self, dt: f32, ctx: &mut GameContext) {
        if let Some(session) = ctx.session.as_mut() {
            session.tick(dt);
        }
    }

    fn tick_level_complete(&mut self, dt: f32, input: &InputSnapshot, ctx: &mut GameContext) {
        if let Some(session) = ctx.session.as_mut() {
            let step = self
                .tally
                .advance(dt, &mut session.player, ctx.settings.difficulty);
            if step.cue {
                session.sounds.play(SoundEffect::GotFlag);
            }
            if let Some((bonus, points)) = step.award {
                info!(bonus = ?bonus, points, score = session.player.score, "level_bonus_awarded");
            }
            if step.finished {
                session.sounds.play(SoundEffect::LevelComplete);
                let next = if session.next_level.is_some() {
                    GameStatus::NextLevel
                } else {
                    GameStatus::Victory
                };
                self.set_status(next);
            }
        }
        // The ball keeps rolling under the tally, including on the frame the
        // tally ends.
        self.advance_play(dt, input, ctx);
    }

    fn tick_paused(&mut self, dt: f32) {
        if self.pause.tick(dt) == PauseTick::Resume {
            self.set_status(GameStatus::InGame);
        }
    }

    pub(super) fn on_key(&mut self, key: Key, ctx: &mut GameContext) -> ModeCommand {
        if ctx.session.is_none() {
            return ModeCommand::None;
        }
        match self.status {
            GameStatus::BeforeGame => {
                if key == Key::SPACE {
                    self.start_game(ctx);
                }
            }
            GameStatus::InGame => self.key_in_game(key, ctx),
            GameStatus::Paused => {
                if !key.is_char_ignore_case('p') {
                    self.pause.leave();
                }
            }
            GameStatus::RestartPlayer => {
                if key == Key::SPACE {
                    self.restart_player(ctx);
                    self.set_status(GameStatus::InGame);
                }
            }
            GameStatus::GameOver => {
                if key == Key::SPACE || key.is_char_ignore_case('n') {
                    return ModeCommand::SwitchTo(HIGH_SCORE_MODE);
                }
            }
            GameStatus::Victory => {
                if key == Key::SPACE {
                    ctx.gamer.player_lose();
                    return ModeCommand::SwitchTo(HIGH_SCORE_MODE);
                }
            }
            GameStatus::NextLevel | GameStatus::BonusLevelComplete => {
                if key == Key::SPACE {
                    self.go_to_next_level(ctx);
                }
            }
            GameStatus::LevelComplete => {}
        }
        ModeCommand::None
    }

    fn key_in_game(&mut self, key: Key, ctx: &mut GameContext) {
        if key.is_char_ignore_case('p') {
            self.pause.enter();
            self.set_status(GameStatus::Paused);
            return;
        }
        if key == Key::PrintScreen {
            self.snapshot_requested = true;
            return;
        }
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        if let Some(request) = session.player.key(key) {
            self.camera.look(request);
        }
    }

    /// Status screens and the HUD drawn over the 3D scene.
    pub(super) fn render_overlay(
        &self,
        info: &FrameInfo,
        ctx: &mut GameContext,
        frame: &mut Frame,
    ) {
        let GameContext {
            session,
            textures,
            settings,
            ..
        } = ctx;
        let Some(session) = session.as_ref() else {
            return;
        };

        if self.status == GameStatus::BeforeGame {
            let level = session.info();
            hud::draw_multi_message(
                frame,
                &[("Track:", level.name.as_str()), ("Author:", level.author.as_str())],
                "Press spacebar to begin",
            );
            return;
        }

        if !info.input.caps_lock() {
            hud::draw_hud(frame, textures, &session.player);
        }
        match self.status {
            GameStatus::GameOver => {
                hud::draw_message(frame, "Game over", "Press spacebar to continue");
            }
            GameStatus::RestartPlayer => {
                hud::draw_message(frame, "Oops", "Press spacebar to continue");
            }
            GameStatus::Paused => hud::draw_pause(frame, self.pause.fade()),
            GameStatus::BonusLevelComplete => {
                hud::draw_message(frame, "Bonus level complete", "Press spacebar to continue");
            }
            GameStatus::LevelComplete => {
                let lines = bonus_lines(
                    &session.player,
                    settings.difficulty,
                    self.tally.visible_lines(),
                );
                hud::draw_bonus_lines(frame, &lines);
            }
            GameStatus::NextLevel => {
                hud::draw_message(frame, "Level complete", "Press spacebar to continue");
            }
            GameStatus::Victory => {
                hud::draw_message(frame, "Congratulations", "You have completed the game!");
            }
            GameStatus::BeforeGame | GameStatus::InGame => {}
        }
    }
}
