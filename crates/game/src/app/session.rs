use engine::app::rendering::{
    draw_sphere, draw_text, draw_triangle, Align, Color, Cull, Frame, Texture, Vertex, View,
};
use glam::Vec3;
use tracing::{debug, info};

use super::level::{Level, LevelInfo};
use super::player::{Player, BALL_RADIUS};
use super::settings::Difficulty;

const SIGN_LIFETIME_SECONDS: f32 = 6.0;
const SIGN_RISE_PER_SECOND: f32 = 0.3;
const SIGN_TEXT_SCALE: i32 = 2;
const DIAMOND_PICKUP_DISTANCE: f32 = 0.6;
const DIAMOND_SIZE: f32 = 0.25;
const DIAMOND_FADE_PER_SECOND: f32 = 1.5;
const DIAMOND_POINTS: i32 = 50;
const FOG_EASE_PER_SECOND: f32 = 0.2;
const BALL_COLOR: Color = [0.85, 0.3, 0.2, 1.0];
const BALL_REFLECTIVITY: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoundEffect {
    Start,
    GotFlag,
    LevelComplete,
    Died,
    GameOver,
    Checkpoint,
}

/// Cues raised during a frame, drained by whoever owns audio output.
#[derive(Debug, Clone, Default)]
pub(crate) struct SoundQueue {
    pending: Vec<SoundEffect>,
}

impl SoundQueue {
    pub(crate) fn play(&mut self, effect: SoundEffect) {
        self.pending.push(effect);
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[SoundEffect] {
        &self.pending
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, SoundEffect> {
        self.pending.drain(..)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    /// Lost a life with lives to spare.
    PlayerDied,
    /// Out of lives or out of time.
    PlayerLost,
    LevelComplete,
    BonusLevelComplete,
}

/// Floating text anchored in the world.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sign {
    pub(crate) text: String,
    pub(crate) position: Vec3,
    age: f32,
}

impl Sign {
    fn alpha(&self) -> f32 {
        (1.0 - self.age / SIGN_LIFETIME_SECONDS).clamp(0.0, 1.0)
    }

    fn expired(&self) -> bool {
        self.age >= SIGN_LIFETIME_SECONDS
    }
}

/// Checkpoint pickup: moves the restart position when collected.
#[derive(Debug, Clone, PartialEq)]
struct Diamond {
    position: Vec3,
    taken: bool,
    fade: f32,
}

/// The running simulation of one level: track, ball, pickups and signs.
#[derive(Debug)]
pub(crate) struct GameSession {
    pub(crate) level: Level,
    pub(crate) player: Player,
    pub(crate) fog_color: Color,
    pub(crate) fog_thickness: f32,
    pub(crate) wanted_fog_thickness: f32,
    pub(crate) is_night: bool,
    pub(crate) next_level: Option<String>,
    pub(crate) sounds: SoundQueue,
    pub(crate) time: f32,
    signs: Vec<Sign>,
    diamonds: Vec<Diamond>,
    goal_reported: bool,
}

impl GameSession {
    pub(crate) fn new(level: Level, difficulty: Difficulty) -> Self {
        let player = Player::new(
            level.info.start_position,
            difficulty.starting_lives(),
            level.info.time_limit,
        );
        let mut session = Self {
            fog_color: level.info.fog_color,
            fog_thickness: level.info.fog_thickness,
            wanted_fog_thickness: level.info.fog_thickness,
            is_night: level.info.is_night,
            next_level: level.info.next_level.clone(),
            level,
            player,
            sounds: SoundQueue::default(),
            time: 0.0,
            signs: Vec::new(),
            diamonds: Vec::new(),
            goal_reported: false,
        };
        session.spawn_diamonds();
        session
    }

    pub(crate) fn info(&self) -> &LevelInfo {
        &self.level.info
    }

    pub(crate) fn start_position(&self) -> Vec3 {
        self.level.info.start_position
    }

    #[cfg(test)]
    pub(crate) fn signs(&self) -> &[Sign] {
        &self.signs
    }

    pub(crate) fn set_next_level(&mut self, next: Option<String>) {
        self.next_level = next;
    }

    pub(crate) fn add_sign(&mut self, text: &str, position: Vec3) {
        self.signs.push(Sign {
            text: text.to_string(),
            position,
            age: 0.0,
        });
    }

    /// Drops everything tied to the current track.
    pub(crate) fn clear_level(&mut self) {
        self.signs.clear();
        self.diamonds.clear();
        self.goal_reported = false;
    }

    pub(crate) fn load_level(&mut self, level: Level) {
        info!(level = %level.info.id, name = %level.info.name, "session_level_loaded");
        self.fog_color = level.info.fog_color;
        self.wanted_fog_thickness = level.info.fog_thickness;
        self.is_night = level.info.is_night;
        self.next_level = level.info.next_level.clone();
        self.level = level;
        self.goal_reported = false;
        self.spawn_diamonds();
    }

    fn spawn_diamonds(&mut self) {
        self.diamonds = self
            .level
            .diamond_cells()
            .iter()
            .map(|&(x, y)| {
                let floor = self.level.cell(x, y).height;
                Diamond {
                    position: Vec3::new(x as f32 + 0.5, y as f32 + 0.5, floor + 0.5),
                    taken: false,
                    fade: 1.0,
                }
            })
            .collect();
    }

    pub(crate) fn tick(&mut self, dt: f32) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.time += dt;

        let fog_step = FOG_EASE_PER_SECOND * dt;
        let fog_gap = self.wanted_fog_thickness - self.fog_thickness;
        self.fog_thickness += fog_gap.clamp(-fog_step, fog_step);

        for sign in &mut self.signs {
            sign.age += dt;
            sign.position.z += SIGN_RISE_PER_SECOND * dt;
        }
        self.signs.retain(|sign| !sign.expired());

        let was_alive = self.player.alive;
        let report = self.player.tick(dt, &self.level);
        self.collect_diamonds(dt);

        if report.died {
            self.player.lives -= 1;
            self.sounds.play(SoundEffect::Died);
            info!(lives = self.player.lives, "player_died");
            if self.player.lives <= 0 {
                self.sounds.play(SoundEffect::GameOver);
                events.push(SessionEvent::PlayerLost);
            } else {
                events.push(SessionEvent::PlayerDied);
            }
        } else if was_alive
            && self.player.alive
            && !self.player.has_won
            && self.player.time_left <= 0.0
        {
            self.player.alive = false;
            self.sounds.play(SoundEffect::GameOver);
            info!("player_out_of_time");
            events.push(SessionEvent::PlayerLost);
        } else if report.reached_goal && !self.player.has_won && !self.goal_reported {
            self.goal_reported = true;
            events.push(if self.level.info.is_bonus {
                SessionEvent::BonusLevelComplete
            } else {
                SessionEvent::LevelComplete
            });
        }
        events
    }

    fn collect_diamonds(&mut self, dt: f32) {
        let ball = self.player.position;
        let mut captured = Vec::new();
        for diamond in &mut self.diamonds {
            if diamond.taken {
                diamond.fade = (diamond.fade - DIAMOND_FADE_PER_SECOND * dt).max(0.0);
                continue;
            }
            if self.player.alive
                && ball.truncate().distance(diamond.position.truncate()) < DIAMOND_PICKUP_DISTANCE
            {
                diamond.taken = true;
                captured.push(diamond.position);
            }
        }
        for position in captured {
            let restart = Vec3::new(position.x, position.y, position.z - 0.5 + BALL_RADIUS);
            self.level.set_start_position(restart);
            self.player.score += DIAMOND_POINTS;
            self.sounds.play(SoundEffect::Checkpoint);
            self.add_sign("Checkpoint", position + Vec3::Z);
            debug!(x = position.x, y = position.y, "checkpoint_taken");
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame, view: &View, environment: Option<&Texture>) {
        self.draw_diamonds(frame, view);
        if self.player.alive {
            draw_sphere(
                frame,
                view,
                self.player.position,
                BALL_RADIUS,
                BALL_COLOR,
                environment,
                BALL_REFLECTIVITY,
            );
        }
        for sign in &self.signs {
            let Some(point) = view.project(sign.position) else {
                continue;
            };
            draw_text(
                frame,
                point.x as i32,
                point.y as i32,
                SIGN_TEXT_SCALE,
                Align::Center,
                &sign.text,
                [1.0, 1.0, 1.0, sign.alpha()],
            );
        }
    }

    /// Everything the ball would see mirrored in itself; the ball is left out.
    pub(crate) fn draw_reflection(&self, frame: &mut Frame, view: &View) {
        self.draw_diamonds(frame, view);
    }

    fn draw_diamonds(&self, frame: &mut Frame, view: &View) {
        for diamond in &self.diamonds {
            if diamond.fade <= 0.0 {
                continue;
            }
            let alpha = if diamond.taken { diamond.fade * 0.5 } else { 1.0 };
            draw_diamond(frame, view, diamond.position, [0.3, 0.9, 1.0, alpha]);
        }
    }
}

fn draw_diamond(frame: &mut Frame, view: &View, center: Vec3, color: Color) {
    let tips = [
        center + Vec3::Z * DIAMOND_SIZE * 1.5,
        center - Vec3::Z * DIAMOND_SIZE * 1.5,
    ];
    let ring = [
        center + Vec3::X * DIAMOND_SIZE,
        center + Vec3::Y * DIAMOND_SIZE,
        center - Vec3::X * DIAMOND_SIZE,
        center - Vec3::Y * DIAMOND_SIZE,
    ];
    for index in 0..ring.len() {
        let a = ring[index];
        let b = ring[(index + 1) % ring.len()];
        for (tip, winding_up) in [(tips[0], true), (tips[1], false)] {
            let (p1, p2) = if winding_up { (a, b) } else { (b, a) };
            let normal = (p1 - tip).cross(p2 - tip).normalize_or_zero();
            let normal = if normal.dot(tip - center) < 0.0 { -normal } else { normal };
            let vertex = |position: Vec3| Vertex {
                position,
                normal,
                color,
            };
            draw_triangle(frame, view, &[vertex(tip), vertex(p1), vertex(p2)], Cull::None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::level::LevelLibrary;

    const DIAMOND_RUN: &str = r##"{
        "name": "Run",
        "start": [0.5, 0.5, 0.3],
        "next_level": "lv2",
        "time_limit": 30,
        "rows": ["G", "#", "D", "#"]
    }"##;

    fn session(raw: &str) -> GameSession {
        GameSession::new(Level::from_json("run", raw).expect("level"), Difficulty::Normal)
    }

    #[test]
    fn new_session_takes_level_metadata() {
        let library = LevelLibrary::builtin();
        let session = GameSession::new(library.load("lv2").expect("lv2"), Difficulty::Easy);
        assert!(session.is_night);
        assert_eq!(session.next_level.as_deref(), Some("bonus1"));
        assert_eq!(session.player.lives, 4);
        assert_eq!(session.fog_thickness, session.wanted_fog_thickness);
    }

    #[test]
    fn diamonds_move_the_restart_point() {
        let mut session = session(DIAMOND_RUN);
        session.player.position = Vec3::new(0.5, 1.5, 0.3);
        session.tick(1.0 / 60.0);
        assert_eq!(session.player.score, DIAMOND_POINTS);
        assert_eq!(session.start_position(), Vec3::new(0.5, 1.5, BALL_RADIUS));
        assert_eq!(session.sounds.pending(), &[SoundEffect::Checkpoint]);
        assert_eq!(session.signs().len(), 1);
        session.tick(1.0 / 60.0);
        assert_eq!(session.player.score, DIAMOND_POINTS);
    }

    #[test]
    fn goal_is_reported_once() {
        let mut session = session(DIAMOND_RUN);
        session.player.position = Vec3::new(0.5, 3.5, 0.3);
        assert_eq!(session.tick(1.0 / 60.0), vec![SessionEvent::LevelComplete]);
        assert!(session.tick(1.0 / 60.0).is_empty());
    }

    #[test]
    fn falling_costs_a_life_then_the_game() {
        let mut session = session(DIAMOND_RUN);
        session.player.lives = 2;
        session.player.position = Vec3::new(3.0, 0.5, -5.9);
        session.player.velocity = Vec3::new(0.0, 0.0, -5.0);
        assert_eq!(session.tick(0.1), vec![SessionEvent::PlayerDied]);
        assert_eq!(session.player.lives, 1);

        session.player.restart(Vec3::new(3.0, 0.5, -5.9));
        session.player.velocity = Vec3::new(0.0, 0.0, -5.0);
        assert_eq!(session.tick(0.1), vec![SessionEvent::PlayerLost]);
        assert_eq!(session.player.lives, 0);
    }

    #[test]
    fn running_out_of_time_loses_the_game() {
        let mut session = session(DIAMOND_RUN);
        session.player.time_left = 0.01;
        assert_eq!(session.tick(0.05), vec![SessionEvent::PlayerLost]);
        assert!(session.tick(0.05).is_empty());
    }

    #[test]
    fn fog_eases_toward_the_wanted_thickness() {
        let mut session = session(DIAMOND_RUN);
        session.wanted_fog_thickness = 1.0;
        session.tick(1.0);
        assert!((session.fog_thickness - FOG_EASE_PER_SECOND).abs() < 1e-6);
    }

    #[test]
    fn signs_expire() {
        let mut session = session(DIAMOND_RUN);
        session.add_sign("Good luck!", Vec3::new(0.5, 0.5, 2.0));
        session.tick(SIGN_LIFETIME_SECONDS / 2.0);
        assert_eq!(session.signs().len(), 1);
        assert!(session.signs()[0].position.z > 2.0);
        session.tick(SIGN_LIFETIME_SECONDS);
        assert!(session.signs().is_empty());
    }

    #[test]
    fn loading_a_level_replaces_linkage() {
        let mut session = session(DIAMOND_RUN);
        session.clear_level();
        let next = LevelLibrary::builtin().load("lv3").expect("lv3");
        session.load_level(next);
        assert_eq!(session.info().name, "Summit");
        assert_eq!(session.next_level, None);
        assert!(session.wanted_fog_thickness > 0.0);
    }
}
