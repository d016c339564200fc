// Per-account spreadsheet ids
// Stored in <config_dir>/comrec/sheets.json

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::strip_comments;

pub const DEFAULT_ACCOUNT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    pub producao_sheet_id: String,
    pub pagamento_sheet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsStore {
    pub accounts: BTreeMap<String, SheetConfig>,
}

/// Accept either a bare id or a full Sheets URL
/// (`https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`).
pub fn extract_sheet_id(input: &str) -> String {
    let input = input.trim();
    match input.split_once("/d/") {
        Some((_, rest)) => rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
        None => input.to_string(),
    }
}

impl SheetsStore {
    pub fn path() -> PathBuf {
        crate::config_dir().join("sheets.json")
    }

    /// Load the store. A missing file is an empty store.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        serde_json::from_str(&strip_comments(&contents)).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
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

    pub fn get(&self, account: &str) -> Option<&SheetConfig> {
        self.accounts.get(account)
    }

    /// Store both ids for `account`. Either may be a full Sheets URL.
    /// Both must be non-empty.
    pub fn set(&mut self, account: &str, producao: &str, pagamento: &str) -> Result<&SheetConfig, ConfigError> {
        let account = account.trim();
        if account.is_empty() {
            return Err(ConfigError::Validation("account name must not be empty".into()));
        }
        let producao_sheet_id = extract_sheet_id(producao);
        let pagamento_sheet_id = extract_sheet_id(pagamento);
        if producao_sheet_id.is_empty() || pagamento_sheet_id.is_empty() {
            return Err(ConfigError::Validation(
                "both the production and the payments spreadsheet ids are required".into(),
            ));
        }

        self.accounts.insert(
            account.to_string(),
            SheetConfig { producao_sheet_id, pagamento_sheet_id },
        );
        log::info!("saved spreadsheet ids for account '{}'", account);
        Ok(&self.accounts[account])
    }
}
