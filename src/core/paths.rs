//! Default locations and shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// The user's home directory, or `/tmp` when `HOME` is unset.
#[must_use]
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(
            || {
                eprintln!("[SMX-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        )
}

/// `~/.config/smx/config.toml`
#[must_use]
pub fn default_config_file() -> PathBuf {
    home_dir().join(".config").join("smx").join("config.toml")
}

/// `~/.local/share/smx`
#[must_use]
pub fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("smx")
}

/// `~/.local/share/smx/activity.jsonl`
#[must_use]
pub fn default_activity_log() -> PathBuf {
    data_dir().join("activity.jsonl")
}

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components. Otherwise the path is made absolute relative to
/// CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
