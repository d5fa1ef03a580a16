use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;

pub use app::{
    run_app, AppError, FrameInfo, GameMode, InputAction, InputSnapshot, Key, LoopConfig,
    LoopMetricsSnapshot, ModeCommand, ModeError, ModeKey, ModeMachine, MouseButton,
    SLOW_FRAME_ENV_VAR,
};

pub const ROOT_ENV_VAR: &str = "TRACKBALL_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub asset_dir: PathBuf,
    pub level_dir: PathBuf,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create snapshot directory at {path}: {source}")]
    CreateSnapshotDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "TRACKBALL_ROOT is set but does not point to a valid game root: {path}\n\
A valid root must contain an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect game root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/trackball\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = app_paths_for_root(root);

    fs::create_dir_all(&paths.snapshot_dir).map_err(|source| StartupError::CreateSnapshotDir {
        path: paths.snapshot_dir.clone(),
        source,
    })?;

    Ok(paths)
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let asset_dir = root.join("assets");
    AppPaths {
        level_dir: asset_dir.join("levels"),
        snapshot_dir: root.join("snapshots"),
        asset_dir,
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_root_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_root_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_root_marker(path: &Path) -> bool {
    path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_marker_requires_assets_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!is_root_marker(dir.path()));
        fs::create_dir(dir.path().join("assets")).expect("mkdir");
        assert!(is_root_marker(dir.path()));
    }

    #[test]
    fn paths_hang_off_the_root() {
        let paths = app_paths_for_root(PathBuf::from("/games/trackball"));
        assert_eq!(paths.asset_dir, PathBuf::from("/games/trackball/assets"));
        assert_eq!(paths.level_dir, PathBuf::from("/games/trackball/assets/levels"));
        assert_eq!(paths.snapshot_dir, PathBuf::from("/games/trackball/snapshots"));
    }
}
