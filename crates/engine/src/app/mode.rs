use thiserror::Error;
use tracing::info;

use super::input::{InputSnapshot, Key, MouseButton};
use super::metrics::LoopMetricsSnapshot;
use super::rendering::Frame;

/// Stable name a mode is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeKey(pub &'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    None,
    SwitchTo(ModeKey),
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("no mode registered under {0:?}")]
    UnknownMode(ModeKey),
    #[error("a mode is already registered under {0:?}")]
    DuplicateMode(ModeKey),
}

/// Per-frame facts handed to `GameMode::render`.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub input: InputSnapshot,
    pub metrics: LoopMetricsSnapshot,
    pub frame_dt_seconds: f32,
}

/// A top-level screen that owns input and rendering while active.
///
/// `C` is the context shared by every mode of an application; the machine
/// owns it and lends it to whichever mode is active.
pub trait GameMode<C> {
    fn activate(&mut self, ctx: &mut C);

    fn deactivate(&mut self, ctx: &mut C);

    fn tick(&mut self, dt_seconds: f32, input: &InputSnapshot, ctx: &mut C) -> ModeCommand;

    fn key(&mut self, key: Key, ctx: &mut C) -> ModeCommand;

    fn mouse_down(&mut self, _button: MouseButton, _ctx: &mut C) -> ModeCommand {
        ModeCommand::None
    }

    fn mouse_motion(&mut self, _dx: f32, _dy: f32, _ctx: &mut C) {}

    fn render(&mut self, info: &FrameInfo, ctx: &mut C, frame: &mut Frame);

    fn wants_cursor_grab(&self) -> bool {
        false
    }

    fn debug_title(&self, _ctx: &C) -> Option<String> {
        None
    }
}

struct ModeSlot<C> {
    key: ModeKey,
    mode: Box<dyn GameMode<C>>,
}

/// Holds every registered mode and the shared context; exactly one mode is
/// active once `start` succeeds.
pub struct ModeMachine<C> {
    slots: Vec<ModeSlot<C>>,
    active: Option<usize>,
    context: C,
}

impl<C> ModeMachine<C> {
    pub fn new(context: C) -> Self {
        Self {
            slots: Vec::new(),
            active: None,
            context,
        }
    }

    pub fn register(&mut self, key: ModeKey, mode: Box<dyn GameMode<C>>) -> Result<(), ModeError> {
        if self.index_of(key).is_some() {
            return Err(ModeError::DuplicateMode(key));
        }
        self.slots.push(ModeSlot { key, mode });
        Ok(())
    }

    pub fn with_mode(mut self, key: ModeKey, mode: Box<dyn GameMode<C>>) -> Result<Self, ModeError> {
        self.register(key, mode)?;
        Ok(self)
    }

    /// Activates `key`. Any previously active mode is deactivated first.
    pub fn start(&mut self, key: ModeKey) -> Result<(), ModeError> {
        self.switch_to(key).map(|_| ())
    }

    /// Returns `Ok(false)` when `key` is already active.
    pub fn switch_to(&mut self, key: ModeKey) -> Result<bool, ModeError> {
        let next = self.index_of(key).ok_or(ModeError::UnknownMode(key))?;
        if self.active == Some(next) {
            return Ok(false);
        }
        if let Some(current) = self.active.take() {
            self.slots[current].mode.deactivate(&mut self.context);
        }
        self.slots[next].mode.activate(&mut self.context);
        self.active = Some(next);
        info!(mode = key.0, "mode_activated");
        Ok(true)
    }

    /// Applies a command returned by the active mode. Returns `true` when the
    /// application should exit.
    pub fn apply(&mut self, command: ModeCommand) -> Result<bool, ModeError> {
        match command {
            ModeCommand::None => Ok(false),
            ModeCommand::SwitchTo(key) => self.switch_to(key).map(|_| false),
            ModeCommand::Quit => Ok(true),
        }
    }

    pub fn active_key(&self) -> Option<ModeKey> {
        self.active.map(|index| self.slots[index].key)
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn tick(&mut self, dt_seconds: f32, input: &InputSnapshot) -> ModeCommand {
        match self.active {
            Some(index) => self.slots[index]
                .mode
                .tick(dt_seconds, input, &mut self.context),
            None => ModeCommand::None,
        }
    }

    pub fn key(&mut self, key: Key) -> ModeCommand {
        match self.active {
            Some(index) => self.slots[index].mode.key(key, &mut self.context),
            None => ModeCommand::None,
        }
    }

    pub fn mouse_down(&mut self, button: MouseButton) -> ModeCommand {
        match self.active {
            Some(index) => self.slots[index].mode.mouse_down(button, &mut self.context),
            None => ModeCommand::None,
        }
    }

    pub fn mouse_motion(&mut self, dx: f32, dy: f32) {
        if let Some(index) = self.active {
            self.slots[index].mode.mouse_motion(dx, dy, &mut self.context);
        }
    }

    pub fn render(&mut self, info: &FrameInfo, frame: &mut Frame) {
        if let Some(index) = self.active {
            self.slots[index].mode.render(info, &mut self.context, frame);
        }
    }

    pub fn wants_cursor_grab(&self) -> bool {
        self.active
            .map(|index| self.slots[index].mode.wants_cursor_grab())
            .unwrap_or(false)
    }

    pub fn debug_title(&self) -> Option<String> {
        self.active
            .and_then(|index| self.slots[index].mode.debug_title(&self.context))
    }

    pub fn shutdown(&mut self) {
        if let Some(index) = self.active.take() {
            self.slots[index].mode.deactivate(&mut self.context);
        }
    }

    fn index_of(&self, key: ModeKey) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ModeKey = ModeKey("a");
    const B: ModeKey = ModeKey("b");

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    struct RecordingMode {
        name: &'static str,
        on_key: ModeCommand,
    }

    impl GameMode<Log> for RecordingMode {
        fn activate(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("{}:activate", self.name));
        }

        fn deactivate(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("{}:deactivate", self.name));
        }

        fn tick(&mut self, _dt_seconds: f32, _input: &InputSnapshot, ctx: &mut Log) -> ModeCommand {
            ctx.events.push(format!("{}:tick", self.name));
            ModeCommand::None
        }

        fn key(&mut self, _key: Key, ctx: &mut Log) -> ModeCommand {
            ctx.events.push(format!("{}:key", self.name));
            self.on_key
        }

        fn render(&mut self, _info: &FrameInfo, ctx: &mut Log, _frame: &mut Frame) {
            ctx.events.push(format!("{}:render", self.name));
        }
    }

    fn machine() -> ModeMachine<Log> {
        ModeMachine::new(Log::default())
            .with_mode(
                A,
                Box::new(RecordingMode {
                    name: "a",
                    on_key: ModeCommand::SwitchTo(B),
                }),
            )
            .and_then(|machine| {
                machine.with_mode(
                    B,
                    Box::new(RecordingMode {
                        name: "b",
                        on_key: ModeCommand::Quit,
                    }),
                )
            })
            .expect("modes")
    }

    #[test]
    fn nothing_is_dispatched_before_start() {
        let mut machine = machine();
        assert_eq!(machine.tick(0.1, &InputSnapshot::empty()), ModeCommand::None);
        assert_eq!(machine.active_key(), None);
        assert!(machine.context().events.is_empty());
    }

    #[test]
    fn switching_deactivates_previous_mode_first() {
        let mut machine = machine();
        machine.start(A).expect("start");
        let command = machine.key(Key::SPACE);
        assert!(!machine.apply(command).expect("apply"));
        assert_eq!(machine.active_key(), Some(B));
        assert_eq!(
            machine.context().events,
            vec!["a:activate", "a:key", "a:deactivate", "b:activate"]
        );
    }

    #[test]
    fn switching_to_active_mode_is_a_no_op() {
        let mut machine = machine();
        machine.start(A).expect("start");
        assert_eq!(machine.switch_to(A), Ok(false));
        assert_eq!(machine.context().events, vec!["a:activate"]);
    }

    #[test]
    fn quit_command_requests_exit() {
        let mut machine = machine();
        machine.start(B).expect("start");
        let command = machine.key(Key::Enter);
        assert_eq!(machine.apply(command), Ok(true));
    }

    #[test]
    fn unknown_and_duplicate_keys_are_rejected() {
        let mut machine = machine();
        assert_eq!(
            machine.start(ModeKey("missing")),
            Err(ModeError::UnknownMode(ModeKey("missing")))
        );
        let duplicate = machine.register(
            A,
            Box::new(RecordingMode {
                name: "dup",
                on_key: ModeCommand::None,
            }),
        );
        assert_eq!(duplicate, Err(ModeError::DuplicateMode(A)));
    }

    #[test]
    fn shutdown_deactivates_active_mode() {
        let mut machine = machine();
        machine.start(A).expect("start");
        machine.shutdown();
        assert_eq!(machine.active_key(), None);
        assert_eq!(machine.context().events, vec!["a:activate", "a:deactivate"]);
    }
}
