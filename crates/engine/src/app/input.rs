/// Held actions sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Jump,
}

const ACTION_COUNT: usize = 5;

/// A discrete key press delivered to the active mode.
///
/// Printable keys arrive as `Char` with the character the layout produced, so
/// `p` and `P` stay distinguishable the same way the mode sees them typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Escape,
    PrintScreen,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    pub const SPACE: Key = Key::Char(' ');

    pub fn is_char_ignore_case(self, expected: char) -> bool {
        match self {
            Key::Char(ch) => ch.eq_ignore_ascii_case(&expected),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Jump => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    caps_lock: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        actions: ActionStates,
        caps_lock: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            actions,
            caps_lock,
            window_width,
            window_height,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_caps_lock(mut self, caps_lock: bool) -> Self {
        self.caps_lock = caps_lock;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}
