// Configuration loading

pub mod error;
pub mod settings;
pub mod sheets;

pub use error::ConfigError;
pub use settings::Settings;
pub use sheets::{extract_sheet_id, SheetConfig, SheetsStore, DEFAULT_ACCOUNT};

use std::path::PathBuf;

/// Overrides the config directory (used by tests and for portable installs).
pub const CONFIG_DIR_ENV: &str = "COMREC_CONFIG_DIR";

/// `$COMREC_CONFIG_DIR`, else `<platform config dir>/comrec`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("comrec")
}

/// Strip comment lines (starting with `//`) so config files can be annotated.
pub(crate) fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
