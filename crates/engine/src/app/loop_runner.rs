use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key as LogicalKey, KeyCode, NamedKey, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::mode::{FrameInfo, ModeCommand, ModeError, ModeKey, ModeMachine};
use super::rendering::{Frame, Presenter};
use super::{InputAction, InputSnapshot, Key, MouseButton};

pub const SLOW_FRAME_ENV_VAR: &str = "TRACKBALL_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Trackball".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize presenter: {0}")]
    CreatePresenter(#[source] PixelsError),
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `modes` until a mode quits or the window
/// closes. Ticks run at a fixed rate; rendering runs once per redraw.
pub fn run_app<C>(
    config: LoopConfig,
    mut modes: ModeMachine<C>,
    initial_mode: ModeKey,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut presenter = Presenter::new(Arc::clone(&window)).map_err(AppError::CreatePresenter)?;
    let (surface_width, surface_height) = presenter.size();
    let mut frame = Frame::new(surface_width, surface_height);

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::new(surface_width, surface_height);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    modes.start(initial_mode)?;

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut last_applied_title: Option<String> = None;
    let mut cursor_grabbed = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = presenter.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                    }
                    let (width, height) = presenter.size();
                    frame.resize(width, height);
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = presenter.resize(size.width, size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                    }
                    let (width, height) = presenter.size();
                    frame.resize(width, height);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let Some(button) = input_collector.handle_mouse_input(button, state) else {
                        return;
                    };
                    let command = modes.mouse_down(button);
                    apply_command(&mut modes, command, window_target);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let Some(key) = input_collector.handle_keyboard_input(&event) else {
                        return;
                    };
                    if key == Key::Escape {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                        return;
                    }
                    let command = modes.key(key);
                    apply_command(&mut modes, command, window_target);
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = modes.tick(fixed_dt_seconds, &input_snapshot);
                        apply_command(&mut modes, command, window_target);
                        metrics_accumulator.record_tick();
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let wants_grab = modes.wants_cursor_grab();
                    if wants_grab != cursor_grabbed {
                        set_cursor_grab(&window, wants_grab);
                        cursor_grabbed = wants_grab;
                    }

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let info = FrameInfo {
                        input: input_collector.peek_snapshot(),
                        metrics: metrics_accumulator.latest(),
                        frame_dt_seconds: clamped_frame_dt.as_secs_f32(),
                    };
                    modes.render(&info, &mut frame);
                    if let Err(error) = presenter.present(&frame) {
                        warn!(error = %error, "presenter_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = modes.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(
                            next_title.as_deref().unwrap_or(config.window_title.as_str()),
                        );
                        last_applied_title = next_title;
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        debug!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            mode = modes.active_key().map(|key| key.0).unwrap_or("none"),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                if cursor_grabbed {
                    modes.mouse_motion(delta.0 as f32, delta.1 as f32);
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                modes.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn apply_command<C>(
    modes: &mut ModeMachine<C>,
    command: ModeCommand,
    window_target: &winit::event_loop::EventLoopWindowTarget<()>,
) {
    match modes.apply(command) {
        Ok(true) => {
            info!(reason = "mode_quit", "shutdown_requested");
            window_target.exit();
        }
        Ok(false) => {}
        Err(error) => {
            warn!(error = %error, "mode_switch_failed");
        }
    }
}

fn set_cursor_grab(window: &Window, grab: bool) {
    let result = if grab {
        window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(error) = result {
        warn!(grab, error = %error, "cursor_grab_failed");
    }
    window.set_cursor_visible(!grab);
}

#[derive(Debug, Default)]
struct InputCollector {
    action_states: ActionStates,
    caps_lock: bool,
    caps_lock_is_down: bool,
    left_mouse_is_down: bool,
    right_mouse_is_down: bool,
    middle_mouse_is_down: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    /// Updates held state and returns the discrete key to dispatch, if any.
    /// Auto-repeat presses are swallowed.
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) -> Option<Key> {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_caps_lock_key_state(
            matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::CapsLock)),
            key_event.state,
        );
        if !is_pressed || key_event.repeat {
            return None;
        }
        if matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::PrintScreen)) {
            return Some(Key::PrintScreen);
        }
        translate_logical_key(&key_event.logical_key)
    }

    fn handle_caps_lock_key_state(&mut self, is_caps_lock: bool, state: ElementState) {
        if !is_caps_lock {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.caps_lock_is_down {
                    self.caps_lock = !self.caps_lock;
                }
                self.caps_lock_is_down = true;
            }
            ElementState::Released => self.caps_lock_is_down = false,
        }
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveUp, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => {
                self.action_states.set(InputAction::Jump, is_pressed);
            }
            _ => {}
        }
    }

    /// Returns the button on a fresh press; held buttons do not repeat.
    fn handle_mouse_input(
        &mut self,
        button: winit::event::MouseButton,
        state: ElementState,
    ) -> Option<MouseButton> {
        let (is_down, mapped) = match button {
            winit::event::MouseButton::Left => (&mut self.left_mouse_is_down, MouseButton::Left),
            winit::event::MouseButton::Right => (&mut self.right_mouse_is_down, MouseButton::Right),
            winit::event::MouseButton::Middle => {
                (&mut self.middle_mouse_is_down, MouseButton::Middle)
            }
            _ => return None,
        };
        match state {
            ElementState::Pressed => {
                let was_down = *is_down;
                *is_down = true;
                (!was_down).then_some(mapped)
            }
            ElementState::Released => {
                *is_down = false;
                None
            }
        }
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        self.peek_snapshot()
    }

    fn peek_snapshot(&self) -> InputSnapshot {
        InputSnapshot::new(
            self.action_states,
            self.caps_lock,
            self.window_width,
            self.window_height,
        )
    }
}

fn translate_logical_key(key: &LogicalKey) -> Option<Key> {
    match key {
        LogicalKey::Character(text) => translate_character(text.as_str()),
        LogicalKey::Named(named) => translate_named_key(*named),
        _ => None,
    }
}

fn translate_character(text: &str) -> Option<Key> {
    let mut chars = text.chars();
    let ch = chars.next()?;
    if chars.next().is_some() || ch.is_control() {
        return None;
    }
    Some(Key::Char(ch))
}

fn translate_named_key(named: NamedKey) -> Option<Key> {
    match named {
        NamedKey::Space => Some(Key::SPACE),
        NamedKey::Enter => Some(Key::Enter),
        NamedKey::Backspace => Some(Key::Backspace),
        NamedKey::Escape => Some(Key::Escape),
        NamedKey::PrintScreen => Some(Key::PrintScreen),
        NamedKey::PageUp => Some(Key::PageUp),
        NamedKey::PageDown => Some(Key::PageDown),
        NamedKey::ArrowUp => Some(Key::ArrowUp),
        NamedKey::ArrowDown => Some(Key::ArrowDown),
        NamedKey::ArrowLeft => Some(Key::ArrowLeft),
        NamedKey::ArrowRight => Some(Key::ArrowRight),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::replace(&mut accumulator, Duration::ZERO)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn caps_lock_toggles_once_per_press() {
        let mut input = InputCollector::default();
        input.handle_caps_lock_key_state(true, ElementState::Pressed);
        input.handle_caps_lock_key_state(true, ElementState::Pressed);
        assert!(input.peek_snapshot().caps_lock());
        input.handle_caps_lock_key_state(true, ElementState::Released);
        input.handle_caps_lock_key_state(true, ElementState::Pressed);
        assert!(!input.peek_snapshot().caps_lock());
        input.handle_caps_lock_key_state(false, ElementState::Pressed);
        assert!(!input.peek_snapshot().caps_lock());
    }

    #[test]
    fn wasd_arrows_and_space_map_to_held_actions() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.is_down(InputAction::Jump));
        assert!(!snapshot.is_down(InputAction::MoveDown));

        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), false);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveUp));
    }

    #[test]
    fn mouse_press_is_edge_triggered() {
        let mut input = InputCollector::default();
        let left = winit::event::MouseButton::Left;
        assert_eq!(
            input.handle_mouse_input(left, ElementState::Pressed),
            Some(MouseButton::Left)
        );
        assert_eq!(input.handle_mouse_input(left, ElementState::Pressed), None);
        assert_eq!(input.handle_mouse_input(left, ElementState::Released), None);
        assert_eq!(
            input.handle_mouse_input(left, ElementState::Pressed),
            Some(MouseButton::Left)
        );
    }

    #[test]
    fn printable_characters_keep_their_case() {
        assert_eq!(translate_character("p"), Some(Key::Char('p')));
        assert_eq!(translate_character("P"), Some(Key::Char('P')));
        assert_eq!(translate_character("ab"), None);
        assert_eq!(translate_character("\u{8}"), None);
        assert_eq!(translate_character(""), None);
    }

    #[test]
    fn named_keys_translate_to_mode_keys() {
        assert_eq!(translate_named_key(NamedKey::Space), Some(Key::SPACE));
        assert_eq!(translate_named_key(NamedKey::PrintScreen), Some(Key::PrintScreen));
        assert_eq!(translate_named_key(NamedKey::Enter), Some(Key::Enter));
        assert_eq!(translate_named_key(NamedKey::F1), None);
    }

    #[test]
    fn snapshot_carries_window_size() {
        let mut input = InputCollector::new(640, 480);
        input.set_window_size(1024, 768);
        assert_eq!(input.snapshot_for_tick().window_size(), (1024, 768));
    }

    #[test]
    fn compute_cap_sleep_respects_budget() {
        let target = target_frame_duration(Some(60));
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert!(compute_cap_sleep(Duration::from_millis(5), target) > Duration::ZERO);
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }
}
