use std::env;

use engine::app::rendering::GfxDetail;
use tracing::warn;

pub(crate) const DIFFICULTY_ENV_VAR: &str = "TRACKBALL_DIFFICULTY";
pub(crate) const GFX_DETAILS_ENV_VAR: &str = "TRACKBALL_GFX_DETAILS";
pub(crate) const SHOW_FPS_ENV_VAR: &str = "TRACKBALL_SHOW_FPS";
pub(crate) const START_LEVEL_ENV_VAR: &str = "TRACKBALL_START_LEVEL";

const DEFAULT_START_LEVEL: &str = "lv1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub(crate) fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Easy),
            1 => Some(Self::Normal),
            2 => Some(Self::Hard),
            _ => None,
        }
    }

    /// Multiplier used by the difficulty bonus.
    pub(crate) fn level(self) -> i32 {
        match self {
            Self::Easy => 0,
            Self::Normal => 1,
            Self::Hard => 2,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }

    pub(crate) fn starting_lives(self) -> i32 {
        match self {
            Self::Easy => 4,
            Self::Normal => 3,
            Self::Hard => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) difficulty: Difficulty,
    pub(crate) gfx_details: GfxDetail,
    pub(crate) show_fps: bool,
    pub(crate) start_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            gfx_details: GfxDetail::default(),
            show_fps: false,
            start_level: DEFAULT_START_LEVEL.to_string(),
        }
    }
}

impl Settings {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var))
    }

    /// Resolves every setting through `lookup`; unreadable or invalid values
    /// are logged and replaced by the default.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let defaults = Self::default();
        let difficulty = read_var(&lookup, DIFFICULTY_ENV_VAR)
            .and_then(|raw| parse_or_warn(DIFFICULTY_ENV_VAR, &raw, parse_difficulty))
            .unwrap_or(defaults.difficulty);
        let gfx_details = read_var(&lookup, GFX_DETAILS_ENV_VAR)
            .and_then(|raw| parse_or_warn(GFX_DETAILS_ENV_VAR, &raw, parse_gfx_details))
            .unwrap_or(defaults.gfx_details);
        let show_fps = read_var(&lookup, SHOW_FPS_ENV_VAR)
            .and_then(|raw| parse_or_warn(SHOW_FPS_ENV_VAR, &raw, parse_flag))
            .unwrap_or(defaults.show_fps);
        let start_level = read_var(&lookup, START_LEVEL_ENV_VAR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or(defaults.start_level);

        Self {
            difficulty,
            gfx_details,
            show_fps,
            start_level,
        }
    }
}

fn read_var<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(env_var = var, error = %err, "unable to read env var; using default");
            None
        }
    }
}

fn parse_or_warn<T>(var: &'static str, raw: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(env_var = var, value = raw, "invalid env var value; using default");
    }
    parsed
}

fn parse_difficulty(raw: &str) -> Option<Difficulty> {
    match raw.to_ascii_lowercase().as_str() {
        "easy" => Some(Difficulty::Easy),
        "normal" => Some(Difficulty::Normal),
        "hard" => Some(Difficulty::Hard),
        other => other.parse::<u8>().ok().and_then(Difficulty::from_level),
    }
}

fn parse_gfx_details(raw: &str) -> Option<GfxDetail> {
    raw.parse::<u8>().ok().and_then(GfxDetail::from_level)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned().ok_or(env::VarError::NotPresent))
    }

    #[test]
    fn missing_vars_use_defaults() {
        assert_eq!(settings_from(&[]), Settings::default());
    }

    #[test]
    fn valid_values_override_defaults() {
        let settings = settings_from(&[
            (DIFFICULTY_ENV_VAR, "hard"),
            (GFX_DETAILS_ENV_VAR, "5"),
            (SHOW_FPS_ENV_VAR, "yes"),
            (START_LEVEL_ENV_VAR, " lv2 "),
        ]);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.gfx_details, GfxDetail::Everything);
        assert!(settings.show_fps);
        assert_eq!(settings.start_level, "lv2");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let settings = settings_from(&[
            (DIFFICULTY_ENV_VAR, "7"),
            (GFX_DETAILS_ENV_VAR, "ultra"),
            (SHOW_FPS_ENV_VAR, "maybe"),
            (START_LEVEL_ENV_VAR, "   "),
        ]);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn numeric_difficulty_maps_to_bonus_multiplier() {
        let settings = settings_from(&[(DIFFICULTY_ENV_VAR, "0")]);
        assert_eq!(settings.difficulty, Difficulty::Easy);
        assert_eq!(Difficulty::Easy.level(), 0);
        assert_eq!(Difficulty::Hard.level(), 2);
        assert_eq!(Difficulty::Normal.label(), "normal");
    }
}
