mod input;
mod loop_runner;
mod metrics;
mod mode;
pub mod rendering;

pub use input::{InputAction, InputSnapshot, Key, MouseButton};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use mode::{FrameInfo, GameMode, ModeCommand, ModeError, ModeKey, ModeMachine};
