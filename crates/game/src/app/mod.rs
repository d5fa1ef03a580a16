pub(crate) mod bootstrap;
mod context;
mod gamer;
mod high_score_mode;
mod level;
pub(crate) mod loop_runner;
mod main_mode;
mod player;
mod session;
mod settings;
