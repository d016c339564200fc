//! Google Sheets retrieval for commission reconciliation.
//!
//! Service-account token exchange, two-sheet fetch and immutable snapshots.
//! Blocking I/O throughout.

pub mod assertion;
pub mod client;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod service;
pub mod snapshot;
pub mod token;

pub use assertion::{AssertionSigner, Claims, SHEETS_READONLY_SCOPE};
pub use client::{build_http_client, SheetsClient, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
pub use credentials::ServiceAccountKey;
pub use error::SheetsError;
pub use fetch::{Fetcher, RawDataset, SheetIds, SheetRanges, SheetSource, DEFAULT_PAYMENT_RANGE, DEFAULT_POLICY_RANGE};
pub use service::{RefreshOutcome, RetrievalBody, RetrievalResponse, RetrievalService};
pub use snapshot::{Snapshot, SnapshotStore};
pub use token::{AccessToken, TokenSource, DEFAULT_TOKEN_URL};

use std::time::Duration;

/// Endpoints and limits for [`connect`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub token_url: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Build a ready-to-use client for `key`. Fails only if the key can't be parsed.
pub fn connect(key: &ServiceAccountKey, options: &ClientOptions) -> Result<SheetsClient, SheetsError> {
    let signer = AssertionSigner::from_key(key)?;
    let http = build_http_client(options.timeout);
    let tokens = TokenSource::new(http.clone(), options.token_url.clone(), signer);
    Ok(SheetsClient::new(http, options.api_base.clone(), tokens))
}
