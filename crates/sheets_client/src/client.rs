//! Google Sheets values API client.
//!
//! Blocking reqwest client (no Tokio runtime required).

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{truncate_body, SheetsError};
use crate::fetch::SheetSource;
use crate::token::TokenSource;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub fn build_http_client(timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("comrec/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Reads cell ranges with a bearer token from a [`TokenSource`].
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    tokens: TokenSource,
}

impl SheetsClient {
    pub fn new(http: reqwest::blocking::Client, api_base: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{range}`, each segment percent-encoded.
    pub fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SheetsError::Configuration(format!("invalid API base '{}': {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Configuration(format!("invalid API base '{}'", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }
}

impl SheetSource for SheetsClient {
    fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let sheet = sheet_label(range);
        let url = self.values_url(spreadsheet_id, range)?;
        let token = self.tokens.access_token()?;

        let resp = self.http.get(url).bearer_auth(token).send().map_err(|e| {
            log::warn!("request for '{sheet}' failed: {e}");
            SheetsError::SourceUnavailable {
                sheet: sheet.to_string(),
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate();
            }
            let body = resp.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| truncate_body(&body));
            log::warn!("sheet '{sheet}' returned {}: {message}", status.as_u16());
            return Err(SheetsError::SourceUnavailable {
                sheet: sheet.to_string(),
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: ValueRange = resp.json().map_err(|e| SheetsError::SourceUnavailable {
            sheet: sheet.to_string(),
            status: Some(status.as_u16()),
            message: format!("invalid response: {e}"),
        })?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// Tab name of an A1 range (`Produção!A:O` → `Produção`).
fn sheet_label(range: &str) -> &str {
    range.split_once('!').map(|(tab, _)| tab).unwrap_or(range)
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
