use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BTT_TOGGL_CONFIG";

const APP_DIR: &str = "btt-toggl";

/// Get the global config directory (~/.config/btt-toggl or $XDG_CONFIG_HOME/btt-toggl)
pub fn get_global_config_dir() -> PathBuf {
    let base = if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config")
    } else {
        PathBuf::from(".config")
    };
    base.join(APP_DIR)
}

/// Get the global config file path (~/.config/btt-toggl/config.yaml)
pub fn get_global_config_path() -> PathBuf {
    get_global_config_dir().join("config.yaml")
}

/// Default cache file location (platform cache dir, e.g. ~/Library/Caches on macOS)
pub fn get_default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| get_global_config_dir().join("cache"))
        .join(APP_DIR)
        .join("status.json")
}

/// Resolve the config file to load.
/// Priority: explicit path > $BTT_TOGGL_CONFIG > global config
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    let from_env = env::var(CONFIG_ENV_VAR).ok();
    resolve_config_path_from(explicit, from_env.as_deref())
}

fn resolve_config_path_from(explicit: Option<&Path>, from_env: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match from_env {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => get_global_config_path(),
    }
}
