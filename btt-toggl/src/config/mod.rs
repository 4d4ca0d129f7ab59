pub mod error;
pub mod loader;
pub mod paths;

pub use error::ConfigError;
pub use loader::{config_exists, ensure_valid, read_config, read_config_with_env, validate_config};
pub use paths::{get_default_cache_path, resolve_config_path};
