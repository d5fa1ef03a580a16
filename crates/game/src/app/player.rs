use engine::{InputAction, InputSnapshot, Key};
use glam::{Vec2, Vec3};
use tracing::debug;

use super::level::{cell_coords, CellKind, Level, WATER_SURFACE};

pub(crate) const BALL_RADIUS: f32 = 0.3;
const ACCELERATION: f32 = 6.0;
const FRICTION: f32 = 1.2;
const ICE_GRIP: f32 = 0.15;
const GRAVITY: f32 = 12.0;
const JUMP_SPEED: f32 = 4.5;
const MAX_STEP_UP: f32 = 0.3;
const FALL_LIMIT: f32 = -6.0;
const MOUSE_SENSITIVITY: f32 = 0.02;
const MAX_MOUSE_PUSH: f32 = 2.0;
const OXYGEN_DRAIN_PER_SECOND: f32 = 0.2;
const OXYGEN_RECOVERY_PER_SECOND: f32 = 0.5;
const SUFFOCATION_DAMAGE_PER_SECOND: f32 = 0.4;
pub(crate) const FROST_SECONDS: f32 = 2.0;
const YAW_STEP: f32 = 1.0;
const TILT_STEP: f32 = 0.2;
pub(crate) const MAX_TILT: f32 = 0.8;

/// Held steering state, sampled from input once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PlayerControls {
    pub(crate) forward: f32,
    pub(crate) right: f32,
    pub(crate) jump: bool,
}

impl PlayerControls {
    pub(crate) fn from_input(input: &InputSnapshot) -> Self {
        let axis = |positive: InputAction, negative: InputAction| {
            let mut value = 0.0;
            if input.is_down(positive) {
                value += 1.0;
            }
            if input.is_down(negative) {
                value -= 1.0;
            }
            value
        };
        Self {
            forward: axis(InputAction::MoveUp, InputAction::MoveDown),
            right: axis(InputAction::MoveRight, InputAction::MoveLeft),
            jump: input.is_down(InputAction::Jump),
        }
    }
}

/// A camera adjustment the player asked for with a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LookRequest {
    Yaw(f32),
    Tilt(f32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StepReport {
    pub(crate) died: bool,
    pub(crate) reached_goal: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Player {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) health: f32,
    pub(crate) oxygen: f32,
    pub(crate) lives: i32,
    pub(crate) score: i32,
    pub(crate) time_left: f32,
    /// Seconds of frozen controls left.
    pub(crate) frozen: f32,
    pub(crate) has_won: bool,
    pub(crate) alive: bool,
    grounded: bool,
    push: Vec2,
    mouse_push: Vec2,
    last_cell: (i32, i32),
    spawn_count: u32,
}

impl Player {
    pub(crate) fn new(start: Vec3, lives: i32, time_limit: f32) -> Self {
        Self {
            position: start,
            velocity: Vec3::ZERO,
            health: 1.0,
            oxygen: 1.0,
            lives,
            score: 0,
            time_left: time_limit,
            frozen: 0.0,
            has_won: false,
            alive: true,
            grounded: false,
            push: Vec2::ZERO,
            mouse_push: Vec2::ZERO,
            last_cell: cell_coords(start),
            spawn_count: 0,
        }
    }

    /// Whole seconds left on the clock, as shown on the HUD.
    pub(crate) fn seconds_left(&self) -> i32 {
        self.time_left.max(0.0) as i32
    }

    #[cfg(test)]
    pub(crate) fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    pub(crate) fn restart(&mut self, start: Vec3) {
        self.position = start;
        self.velocity = Vec3::ZERO;
        self.health = 1.0;
        self.oxygen = 1.0;
        self.frozen = 0.0;
        self.has_won = false;
        self.alive = true;
        self.grounded = false;
        self.push = Vec2::ZERO;
        self.mouse_push = Vec2::ZERO;
        self.last_cell = cell_coords(start);
    }

    pub(crate) fn new_level(&mut self, time_limit: f32) {
        self.time_left = time_limit;
        self.has_won = false;
    }

    /// Runs once each time the ball is put into play.
    pub(crate) fn trigger_spawn_hook(&mut self) {
        self.spawn_count += 1;
        self.velocity = Vec3::ZERO;
        debug!(
            x = self.position.x,
            y = self.position.y,
            z = self.position.z,
            spawn = self.spawn_count,
            "player_spawned"
        );
    }

    pub(crate) fn key(&mut self, key: Key) -> Option<LookRequest> {
        match key {
            Key::Char('e') | Key::Char('E') => Some(LookRequest::Yaw(YAW_STEP)),
            Key::Char('q') | Key::Char('Q') => Some(LookRequest::Yaw(-YAW_STEP)),
            Key::PageUp => Some(LookRequest::Tilt(TILT_STEP)),
            Key::PageDown => Some(LookRequest::Tilt(-TILT_STEP)),
            _ => None,
        }
    }

    pub(crate) fn mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_push += Vec2::new(dx, -dy) * MOUSE_SENSITIVITY;
        self.mouse_push = self.mouse_push.clamp_length_max(MAX_MOUSE_PUSH);
    }

    /// Converts camera-relative controls into a world-space push for the
    /// next tick. `yaw` is in quarter turns, as the camera keeps it.
    pub(crate) fn steer(&mut self, controls: PlayerControls, yaw: f32) {
        let angle = yaw * std::f32::consts::FRAC_PI_2 + std::f32::consts::FRAC_PI_4;
        let forward = Vec2::new(angle.sin(), angle.cos());
        let right = Vec2::new(angle.cos(), -angle.sin());
        let wanted = Vec2::new(controls.right, controls.forward) + self.mouse_push;
        self.mouse_push = Vec2::ZERO;
        self.push = (forward * wanted.y + right * wanted.x).clamp_length_max(1.0);
        if controls.jump && self.grounded && self.can_steer() {
            self.velocity.z = JUMP_SPEED;
            self.grounded = false;
        }
    }

    fn can_steer(&self) -> bool {
        self.frozen <= 0.0 && !self.has_won && self.alive
    }

    pub(crate) fn tick(&mut self, dt: f32, level: &Level) -> StepReport {
        let mut report = StepReport::default();
        if !self.alive {
            return report;
        }

        self.frozen = (self.frozen - dt).max(0.0);
        if !self.has_won {
            self.time_left = (self.time_left - dt).max(0.0);
        }

        let grip = if level.cell_at(self.position).kind == CellKind::Ice {
            ICE_GRIP
        } else {
            1.0
        };
        let push = if self.can_steer() { self.push } else { Vec2::ZERO };
        let mut planar = self.velocity.truncate() + push * ACCELERATION * grip * dt;
        planar *= (1.0 - FRICTION * grip * dt).max(0.0);
        self.velocity.x = planar.x;
        self.velocity.y = planar.y;
        self.velocity.z -= GRAVITY * dt;

        let bottom = self.position.z - BALL_RADIUS;
        let mut next = self.position + self.velocity * dt;
        if let Some(floor) = level.floor_height(next) {
            if floor - bottom > MAX_STEP_UP {
                // Wall: keep the old cell and stop sideways motion.
                next.x = self.position.x;
                next.y = self.position.y;
                self.velocity.x = 0.0;
                self.velocity.y = 0.0;
            }
        }
        self.grounded = false;
        if let Some(floor) = level.floor_height(next) {
            if next.z - BALL_RADIUS <= floor && bottom >= floor - MAX_STEP_UP {
                next.z = floor + BALL_RADIUS;
                self.velocity.z = self.velocity.z.max(0.0);
                self.grounded = true;
            }
        }
        self.position = next;

        let cell = level.cell_at(self.position);
        let coords = cell_coords(self.position);
        if coords != self.last_cell {
            self.last_cell = coords;
            if cell.kind == CellKind::Frost {
                self.frozen = FROST_SECONDS;
            }
        }

        if self.position.z < WATER_SURFACE && cell.kind == CellKind::Water {
            self.oxygen = (self.oxygen - OXYGEN_DRAIN_PER_SECOND * dt).max(0.0);
        } else {
            self.oxygen = (self.oxygen + OXYGEN_RECOVERY_PER_SECOND * dt).min(1.0);
        }
        if self.oxygen <= 0.0 {
            self.health = (self.health - SUFFOCATION_DAMAGE_PER_SECOND * dt).max(0.0);
        }

        if self.position.z < FALL_LIMIT || self.health <= 0.0 {
            self.alive = false;
            report.died = true;
            return report;
        }
        report.reached_goal = self.grounded && cell.kind == CellKind::Goal;
        report
    }
}
