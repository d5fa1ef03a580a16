use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use engine::app::rendering::View;
use glam::Vec3;

use crate::app::player::{LookRequest, MAX_TILT};

/// Angle change per second for both yaw (quarter turns) and tilt.
const ANGLE_RATE: f32 = 0.4;
const YAW_TURN: f32 = 4.0;
const FOLLOW_STEP_SECONDS: f32 = 0.01;
const FOLLOW_DAMPING: f32 = 0.9;
const FOLLOW_PULL: f32 = 0.002;
const CHASE_DISTANCE: f32 = 10.0;
const CHASE_FOV_DEGREES: f32 = 40.0;
const ORBIT_RADIUS: f32 = 12.0;
const ORBIT_HEIGHT: f32 = 10.0;
const ENV_FOV_DEGREES: f32 = 140.0;
const NEAR: f32 = 0.1;
const ENV_NEAR: f32 = 0.01;
const FAR: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LookAt {
    pub(crate) eye: Vec3,
    pub(crate) center: Vec3,
    pub(crate) up: Vec3,
}

impl LookAt {
    fn apply(&self, view: &mut View) {
        view.set_look_at(self.eye, self.center, self.up);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct CameraState {
    pub(crate) focus: Vec3,
    pub(crate) focus_delta: Vec3,
    /// Quarter turns in `[0, 4)`.
    pub(crate) yaw: f32,
    pub(crate) yaw_target: f32,
    /// 0 looks down at the ball from behind, `MAX_TILT` is nearly overhead.
    pub(crate) tilt: f32,
    pub(crate) tilt_target: f32,
    pub(crate) time: f32,
    pub(crate) flash: f32,
}

impl CameraState {
    pub(crate) fn zero_angles(&mut self) {
        self.yaw = 0.0;
        self.yaw_target = 0.0;
        self.tilt = 0.0;
        self.tilt_target = 0.0;
    }

    /// Puts the camera back at its pre-game position near `start`.
    pub(crate) fn reset(&mut self, start: Vec3) {
        self.zero_angles();
        self.focus = Vec3::new(start.x - 5.0, start.y - 5.0, 0.0);
        self.focus_delta = Vec3::ZERO;
        self.time = 0.0;
        self.flash = 0.0;
    }

    /// Advances the clock and lets the flash timer run down to zero.
    pub(crate) fn advance_clock(&mut self, dt: f32) {
        self.time += dt;
        self.flash = (self.flash - dt).max(0.0);
    }

    pub(crate) fn look(&mut self, request: LookRequest) {
        match request {
            LookRequest::Yaw(step) => {
                self.yaw_target = (self.yaw_target + step).rem_euclid(YAW_TURN);
            }
            LookRequest::Tilt(step) => {
                self.tilt_target = (self.tilt_target + step).clamp(0.0, MAX_TILT);
            }
        }
    }

    /// Moves tilt and yaw toward their targets without overshooting.
    pub(crate) fn smooth(&mut self, dt: f32) {
        let max_step = ANGLE_RATE * dt;
        self.tilt += (self.tilt_target - self.tilt).clamp(-max_step, max_step);

        let gap = shortest_yaw_gap(self.yaw, self.yaw_target);
        if gap.abs() <= max_step {
            self.yaw = self.yaw_target;
        } else {
            self.yaw = (self.yaw + gap.signum() * max_step).rem_euclid(YAW_TURN);
        }
    }

    /// Springs the focus toward the ball in fixed sub-steps.
    pub(crate) fn follow(&mut self, dt: f32, target: Vec3) {
        let steps = (dt.max(0.0) / FOLLOW_STEP_SECONDS).floor() as u32 + 1;
        for _ in 0..steps {
            self.focus_delta = self.focus_delta * FOLLOW_DAMPING + (target - self.focus) * FOLLOW_PULL;
            self.focus += self.focus_delta;
        }
    }

    fn angle(&self) -> f32 {
        self.yaw * FRAC_PI_2 + FRAC_PI_4
    }

    fn up(&self) -> Vec3 {
        let angle = self.angle();
        Vec3::new(
            angle.sin() * self.tilt,
            angle.cos() * self.tilt,
            1.0 - self.tilt,
        )
        .normalize_or(Vec3::Z)
    }

    /// Horizontal offset from the focus back toward the chase eye.
    fn behind(&self, focus: Vec3) -> (f32, f32) {
        let angle = self.angle();
        let pitch = self.tilt * FRAC_PI_2;
        (
            focus.x - CHASE_DISTANCE * angle.sin() * pitch.cos(),
            focus.y - CHASE_DISTANCE * angle.cos() * pitch.cos(),
        )
    }

    fn chase_height(&self, focus: Vec3) -> f32 {
        let pitch = self.tilt * FRAC_PI_2;
        10.0 + focus.z * 0.5 + (10.0 + focus.z) * pitch.sin()
    }

    pub(crate) fn chase_look_at(&self) -> LookAt {
        let (x, y) = self.behind(self.focus);
        LookAt {
            eye: Vec3::new(x, y, self.chase_height(self.focus)),
            center: self.focus,
            up: self.up(),
        }
    }

    /// Slow circle around the start position shown before play begins.
    pub(crate) fn orbit_look_at(&self, start: Vec3) -> LookAt {
        let t = self.time;
        LookAt {
            eye: Vec3::new(
                start.x - ORBIT_RADIUS * t.sin(),
                start.y - ORBIT_RADIUS * t.cos(),
                ORBIT_HEIGHT + start.z,
            ),
            center: start,
            up: Vec3::Z,
        }
    }

    /// View from the ball itself, looking back toward the chase camera.
    pub(crate) fn environment_look_at(&self, focus: Vec3) -> LookAt {
        let (x, y) = self.behind(focus);
        let z = if self.tilt > 0.0 {
            self.chase_height(focus)
        } else {
            focus.z + 2.0
        };
        LookAt {
            eye: focus,
            center: Vec3::new(x, y, z),
            up: self.up(),
        }
    }

    pub(crate) fn apply_chase_view(&self, view: &mut View, aspect: f32) {
        view.set_perspective(CHASE_FOV_DEGREES, aspect, NEAR, FAR);
        self.chase_look_at().apply(view);
    }

    pub(crate) fn apply_orbit_view(&self, view: &mut View, aspect: f32, start: Vec3) {
        view.set_perspective(CHASE_FOV_DEGREES, aspect, NEAR, FAR);
        self.orbit_look_at(start).apply(view);
    }

    pub(crate) fn apply_environment_view(&self, view: &mut View, aspect: f32, focus: Vec3) {
        view.set_perspective(ENV_FOV_DEGREES, aspect, ENV_NEAR, FAR);
        self.environment_look_at(focus).apply(view);
    }
}

/// Signed yaw change toward `target`, taking the shorter way around the
/// circle; the direct route wins a tie.
pub(crate) fn shortest_yaw_gap(yaw: f32, target: f32) -> f32 {
    let direct = target - yaw;
    [direct + YAW_TURN, direct - YAW_TURN]
        .into_iter()
        .fold(direct, |best, candidate| {
            if candidate.abs() < best.abs() {
                candidate
            } else {
                best
            }
        })
}

/// Aspect ratio guarded against a zero-height window.
pub(crate) fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn yaw_takes_the_short_way_round() {
        assert!(approx(shortest_yaw_gap(0.0, 3.0), -1.0));
        assert!(approx(shortest_yaw_gap(3.0, 0.0), 1.0));
        assert!(approx(shortest_yaw_gap(1.0, 2.0), 1.0));
        assert!(approx(shortest_yaw_gap(0.0, 2.0), 2.0));
    }

    #[test]
    fn yaw_wraps_while_smoothing() {
        let mut camera = CameraState {
            yaw_target: 3.0,
            ..CameraState::default()
        };
        camera.smooth(1.0);
        assert!(approx(camera.yaw, 3.6));
        camera.smooth(1.0);
        assert!(approx(camera.yaw, 3.2));
        camera.smooth(1.0);
        assert_eq!(camera.yaw, 3.0);
    }

    #[test]
    fn smoothing_never_overshoots() {
        let mut camera = CameraState {
            tilt_target: 0.1,
            yaw_target: 0.3,
            ..CameraState::default()
        };
        camera.smooth(1.0);
        assert_eq!(camera.tilt, 0.1);
        assert_eq!(camera.yaw, 0.3);
        camera.smooth(0.1);
        assert_eq!(camera.tilt, 0.1);
    }

    #[test]
    fn look_requests_wrap_yaw_and_clamp_tilt() {
        let mut camera = CameraState::default();
        camera.look(LookRequest::Yaw(-1.0));
        assert_eq!(camera.yaw_target, 3.0);
        for _ in 0..10 {
            camera.look(LookRequest::Tilt(0.2));
        }
        assert_eq!(camera.tilt_target, MAX_TILT);
        camera.look(LookRequest::Tilt(-5.0));
        assert_eq!(camera.tilt_target, 0.0);
    }

    #[test]
    fn follow_runs_one_sub_step_per_centisecond_plus_one() {
        let mut camera = CameraState::default();
        camera.follow(0.0, Vec3::X);
        assert!(approx(camera.focus.x, FOLLOW_PULL));

        let mut camera = CameraState::default();
        camera.follow(0.025, Vec3::X);
        let mut focus = 0.0;
        let mut delta = 0.0;
        for _ in 0..3 {
            delta = delta * FOLLOW_DAMPING + (1.0 - focus) * FOLLOW_PULL;
            focus += delta;
        }
        assert!(approx(camera.focus.x, focus));
    }

    #[test]
    fn chase_eye_sits_behind_and_above_the_focus() {
        let camera = CameraState::default();
        let look = camera.chase_look_at();
        let offset = CHASE_DISTANCE * FRAC_PI_4.sin();
        assert!(approx(look.eye.x, -offset));
        assert!(approx(look.eye.y, -offset));
        assert!(approx(look.eye.z, 10.0));
        assert_eq!(look.up, Vec3::Z);
    }

    #[test]
    fn environment_view_looks_back_from_the_ball() {
        let camera = CameraState::default();
        let focus = Vec3::new(1.0, 2.0, 0.5);
        let look = camera.environment_look_at(focus);
        assert_eq!(look.eye, focus);
        assert!(approx(look.center.z, 2.5));

        let tilted = CameraState {
            tilt: 0.5,
            ..CameraState::default()
        };
        let look = tilted.environment_look_at(focus);
        assert!(approx(look.center.z, tilted.chase_height(focus)));
    }

    #[test]
    fn flash_runs_down_and_stops_at_zero() {
        let mut camera = CameraState {
            flash: 0.3,
            ..CameraState::default()
        };
        camera.advance_clock(0.2);
        assert!(approx(camera.flash, 0.1));
        camera.advance_clock(0.2);
        assert_eq!(camera.flash, 0.0);
        assert!(approx(camera.time, 0.4));
    }

    #[test]
    fn reset_offsets_focus_from_start() {
        let mut camera = CameraState {
            yaw: 2.0,
            tilt: 0.4,
            time: 9.0,
            ..CameraState::default()
        };
        camera.reset(Vec3::new(10.0, 20.0, 3.0));
        assert_eq!(camera.focus, Vec3::new(5.0, 15.0, 0.0));
        assert_eq!((camera.yaw, camera.tilt, camera.time), (0.0, 0.0, 0.0));
    }

    #[test]
    fn orbit_circles_the_start() {
        let camera = CameraState::default();
        let start = Vec3::new(3.0, 4.0, 1.0);
        let look = camera.orbit_look_at(start);
        assert_eq!(look.eye, Vec3::new(3.0, 4.0 - ORBIT_RADIUS, ORBIT_HEIGHT + 1.0));
        assert_eq!(look.center, start);
    }
}
