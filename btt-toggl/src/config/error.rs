use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    /// YAML did not match `TogglConfig`
    ParseError(String),
    Unreadable(std::io::Error),
    /// Every problem found by `validate_config`, or missing icon files
    ValidationError(Vec<String>),
    /// Requested pair is missing from `projects`
    UnknownProject { workspace: u64, project: u64 },
    IncompleteQuery,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "No config at {path}; pass --config or set BTT_TOGGL_CONFIG")
            }
            ConfigError::ParseError(msg) => write!(f, "Invalid config: {msg}"),
            ConfigError::Unreadable(err) => write!(f, "Could not read config: {err}"),
            ConfigError::ValidationError(errors) => {
                writeln!(f, "Config validation failed:")?;
                for err in errors {
                    writeln!(f, "  - {err}")?;
                }
                Ok(())
            }
            ConfigError::UnknownProject { workspace, project } => write!(
                f,
                "Project {project} in workspace {workspace} is not in the configured projects"
            ),
            ConfigError::IncompleteQuery => {
                write!(f, "Both a workspace id and a project id are required")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Unreadable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Unreadable(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
