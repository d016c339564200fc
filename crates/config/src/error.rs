use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written
    Io { path: PathBuf, message: String },
    /// File contents are not valid JSON for the expected shape
    Parse { path: PathBuf, message: String },
    /// Value rejected before saving
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config in {}: {}", path.display(), message)
            }
            ConfigError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
