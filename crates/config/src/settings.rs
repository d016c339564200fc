// Application settings
// Loaded from <config_dir>/comrec/settings.json

use comrec_sheets_client::{
    DEFAULT_API_BASE, DEFAULT_PAYMENT_RANGE, DEFAULT_POLICY_RANGE, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_URL,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::strip_comments;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Endpoints
    #[serde(rename = "sheets.apiBase")]
    pub api_base: String,

    #[serde(rename = "auth.tokenUrl")]
    pub token_url: String,

    // Ranges (A1 notation, tab name first)
    #[serde(rename = "sheets.policyRange")]
    pub policy_range: String,

    #[serde(rename = "sheets.paymentRange")]
    pub payment_range: String,

    // HTTP
    #[serde(rename = "http.timeoutSecs")]
    pub timeout_secs: u64,

    // Watch
    #[serde(rename = "watch.refreshIntervalSecs")]
    pub refresh_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            policy_range: DEFAULT_POLICY_RANGE.to_string(),
            payment_range: DEFAULT_PAYMENT_RANGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_interval_secs: 30,
        }
    }
}

// Written on first run; must parse to `Settings::default()`.
const DEFAULT_FILE: &str = r#"{
    // Google Sheets values API and OAuth token endpoint
    "sheets.apiBase": "https://sheets.googleapis.com",
    "auth.tokenUrl": "https://oauth2.googleapis.com/token",

    // Ranges read from the production and payments spreadsheets
    "sheets.policyRange": "Produção!A:O",
    "sheets.paymentRange": "Pagamentos!A:J",

    // Per-request timeout
    "http.timeoutSecs": 15,

    // `comrec watch` refresh period
    "watch.refreshIntervalSecs": 30
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults.
    /// Writes a commented default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Strict load: read errors, parse errors and invalid values are reported.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings: Settings = serde_json::from_str(&strip_comments(&contents)).map_err(|e| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation("http.timeoutSecs must be at least 1".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "watch.refreshIntervalSecs must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("sheets.apiBase", &self.api_base),
            ("auth.tokenUrl", &self.token_url),
            ("sheets.policyRange", &self.policy_range),
            ("sheets.paymentRange", &self.payment_range),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}
