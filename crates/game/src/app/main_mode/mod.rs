//! The in-game mode: status machine, camera, reflections and overlays.

mod camera;
mod environment;
mod hud;
mod pause;
mod status;
mod tally;


use std::path::Path;

use engine::app::rendering::{Fog, Frame, GfxDetail, Lighting, View, BLACK};
use engine::{FrameInfo, GameMode, InputSnapshot, Key, ModeCommand, ModeKey, MouseButton};
use glam::Vec3;
use tracing::{debug, error, info, warn};

use self::camera::{aspect_ratio, CameraState};
use self::environment::EnvironmentMapper;
use self::pause::PauseState;
use self::status::GameStatus;
use self::tally::Tally;
use super::context::GameContext;
use super::level::{cell_coords, DrawPass};
use super::player::PlayerControls;
use super::session::{GameSession, SessionEvent, SoundEffect};

pub(crate) const MAIN_MODE: ModeKey = ModeKey("main");

const SIGN_HEIGHT: f32 = 2.0;

/// Fog and lighting for the current track, without camera matrices.
pub(crate) fn scene_view(session: &GameSession, detail: GfxDetail, viewport: (u32, u32)) -> View {
    let thickness = session.fog_thickness;
    View {
        fog: Fog {
            enabled: thickness != 0.0 && detail != GfxDetail::None,
            color: session.fog_color,
            start: (14.0 - 7.0 * thickness).max(0.0),
            end: 26.0 - 4.0 * thickness,
        },
        lighting: if session.is_night {
            Lighting::lantern(session.player.position)
        } else {
            Lighting::sun()
        },
        detail,
        viewport,
        ..View::default()
    }
}

#[derive(Debug)]
pub(crate) struct MainMode {
    status: GameStatus,
    camera: CameraState,
    pause: PauseState,
    tally: Tally,
    environment: EnvironmentMapper,
    snapshot_requested: bool,
    snapshot_counter: u32,
}

impl MainMode {
    pub(crate) fn new() -> Self {
        Self {
            status: GameStatus::BeforeGame,
            camera: CameraState::default(),
            pause: PauseState::default(),
            tally: Tally::default(),
            environment: EnvironmentMapper::default(),
            snapshot_requested: false,
            snapshot_counter: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> GameStatus {
        self.status
    }

    /// Puts the ball into play on the current level.
    pub(crate) fn start_game(&mut self, ctx: &mut GameContext) {
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        self.set_status(GameStatus::InGame);
        session.player.has_won = false;
        session.sounds.play(SoundEffect::Start);
        ctx.gamer.level_started();
        let start = session.start_position();
        session.add_sign("Good luck!", start + Vec3::Z * SIGN_HEIGHT);
        session.player.position.z += 1.0;
        session.player.trigger_spawn_hook();
    }

    /// Returns the ball to the start (or last checkpoint). Leaves the status
    /// to the caller.
    pub(crate) fn restart_player(&mut self, ctx: &mut GameContext) {
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        let start = session.start_position();
        session.player.restart(start);
        self.camera.focus.x = start.x;
        self.camera.focus.y = start.y;
        ctx.gamer.level_started();
        session.add_sign("Good luck!", start + Vec3::Z * SIGN_HEIGHT);
        session.player.trigger_spawn_hook();
    }

    pub(crate) fn level_complete(&mut self, ctx: &mut GameContext) {
        if let Some(session) = ctx.session.as_mut() {
            session.player.has_won = true;
        }
        self.set_status(GameStatus::LevelComplete);
        self.tally.reset();
    }

    pub(crate) fn bonus_level_complete(&mut self, ctx: &mut GameContext) {
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        let return_level = session.info().return_level.clone();
        session.set_next_level(return_level);
        self.set_status(GameStatus::BonusLevelComplete);
    }

    pub(crate) fn player_die(&mut self) {
        self.set_status(GameStatus::RestartPlayer);
    }

    pub(crate) fn player_lose(&mut self, ctx: &mut GameContext) {
        ctx.gamer.player_lose();
        self.set_status(GameStatus::GameOver);
    }

    /// One step of live play: camera smoothing, the simulation tick, then the
    /// focus spring. Shared by InGame, NextLevel and the bonus tally.
    fn advance_play(&mut self, dt: f32, input: &InputSnapshot, ctx: &mut GameContext) {
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        self.camera.smooth(dt);
        session
            .player
            .steer(PlayerControls::from_input(input), self.camera.yaw);
        let events = session.tick(dt);
        self.camera.follow(dt, session.player.position);

        for event in events {
            if self.status != GameStatus::InGame {
                break;
            }
            match event {
                SessionEvent::PlayerDied => self.player_die(),
                SessionEvent::PlayerLost => self.player_lose(ctx),
                SessionEvent::LevelComplete => self.level_complete(ctx),
                SessionEvent::BonusLevelComplete => self.bonus_level_complete(ctx),
            }
        }
    }

    fn go_to_next_level(&mut self, ctx: &mut GameContext) {
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        let Some(next) = session.next_level.clone() else {
            self.set_status(GameStatus::Victory);
            return;
        };
        self.camera.zero_angles();
        session.fog_thickness = session.wanted_fog_thickness;
        session.clear_level();
        match ctx.levels.load(&next) {
            Ok(level) => session.load_level(level),
            Err(err) => {
                warn!(level = %next, error = %err, "next_level_load_failed");
                self.set_status(GameStatus::Victory);
                return;
            }
        }
        let time_limit = session.info().time_limit;
        session.player.new_level(time_limit);
        self.restart_player(ctx);
        self.set_status(GameStatus::BeforeGame);
    }

    fn save_snapshot(&mut self, frame: &Frame, dir: &Path) {
        self.snapshot_requested = false;
        let mut path = dir.join(format!("snapshot-{:04}.png", self.snapshot_counter));
        while path.exists() {
            self.snapshot_counter += 1;
            path = dir.join(format!("snapshot-{:04}.png", self.snapshot_counter));
        }
        match frame.save_png(&path) {
            Ok(()) => info!(path = %path.display(), "snapshot_saved"),
            Err(err) => warn!(path = %path.display(), error = %err, "snapshot_failed"),
        }
        self.snapshot_counter += 1;
    }
}

impl Default for MainMode {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode<GameContext> for MainMode {
    fn activate(&mut self, ctx: &mut GameContext) {
        if ctx.session.is_none() {
            if let Err(err) = ctx.new_session() {
                error!(error = %err, "session_start_failed");
                return;
            }
        }
        let Some(session) = ctx.session.as_ref() else {
            return;
        };
        self.camera.reset(session.start_position());
        self.pause.reset();
        self.tally.reset();
        self.status = GameStatus::BeforeGame;
        info!(level = %session.info().id, "main_mode_ready");
    }

    fn deactivate(&mut self, _ctx: &mut GameContext) {
        self.environment.release();
    }

    fn tick(&mut self, dt_seconds: f32, input: &InputSnapshot, ctx: &mut GameContext) -> ModeCommand {
        self.on_tick(dt_seconds, input, ctx);
        ModeCommand::None
    }

    fn key(&mut self, key: Key, ctx: &mut GameContext) -> ModeCommand {
        self.on_key(key, ctx)
    }

    fn mouse_down(&mut self, button: MouseButton, ctx: &mut GameContext) -> ModeCommand {
        if button == MouseButton::Left {
            self.on_key(Key::SPACE, ctx)
        } else {
            ModeCommand::None
        }
    }

    fn mouse_motion(&mut self, dx: f32, dy: f32, ctx: &mut GameContext) {
        if self.status != GameStatus::InGame {
            return;
        }
        if let Some(session) = ctx.session.as_mut() {
            session.player.mouse_motion(dx, dy);
        }
    }

    fn render(&mut self, info: &FrameInfo, ctx: &mut GameContext, frame: &mut Frame) {
        let Some(session) = ctx.session.as_mut() else {
            frame.clear(BLACK);
            return;
        };
        for cue in session.sounds.drain() {
            debug!(cue = ?cue, "sound_cue");
        }

        let (width, height) = frame.size();
        let aspect = aspect_ratio(width, height);
        let reflections =
            ctx.settings.gfx_details >= GfxDetail::Extra && self.status != GameStatus::BeforeGame;
        if reflections {
            let focus = session.player.position;
            self.environment.render(
                frame,
                session,
                &self.camera,
                focus,
                &mut ctx.settings.gfx_details,
            );
        }

        frame.clear(if session.fog_thickness != 0.0 {
            session.fog_color
        } else {
            BLACK
        });
        let mut view = scene_view(session, ctx.settings.gfx_details, (width, height));
        let cell = if self.status == GameStatus::BeforeGame {
            let start = session.start_position();
            self.camera.apply_orbit_view(&mut view, aspect, start);
            cell_coords(start)
        } else {
            self.camera.apply_chase_view(&mut view, aspect);
            cell_coords(self.camera.focus)
        };
        session.level.draw(DrawPass::Background, cell, frame, &view);
        let environment = if reflections {
            self.environment.texture()
        } else {
            None
        };
        session.draw(frame, &view, environment);
        session.level.draw(DrawPass::Foreground, cell, frame, &view);
        let frozen = session.player.frozen;

        self.render_overlay(info, ctx, frame);
        hud::draw_frozen_tint(frame, frozen);
        if ctx.settings.show_fps {
            hud::draw_fps(frame, info.metrics.fps);
        }
        if self.snapshot_requested {
            let dir = ctx.snapshot_dir.clone();
            self.save_snapshot(frame, &dir);
        }
    }

    fn wants_cursor_grab(&self) -> bool {
        self.status != GameStatus::Paused
    }

    fn debug_title(&self, ctx: &GameContext) -> Option<String> {
        let level = ctx
            .session
            .as_ref()
            .map(|session| session.info().name.as_str())
            .unwrap_or("-");
        Some(format!("Trackball | {level} | {}", self.status.label()))
    }
}
