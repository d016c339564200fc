//! Bearer-token acquisition with an in-memory cache.

use parking_lot::Mutex;
use serde::Deserialize;

use crate::assertion::AssertionSigner;
use crate::error::{truncate_body, SheetsError};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AccessToken {
    pub fn is_fresh(&self, now: i64) -> bool {
        now + EXPIRY_SKEW_SECS < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Exchanges signed assertions for bearer tokens, re-signing only when the
/// cached token is absent or about to expire.
pub struct TokenSource {
    http: reqwest::blocking::Client,
    token_url: String,
    signer: AssertionSigner,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(http: reqwest::blocking::Client, token_url: impl Into<String>, signer: AssertionSigner) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            signer,
            cached: Mutex::new(None),
        }
    }

    pub fn access_token(&self) -> Result<String, SheetsError> {
        self.access_token_at(chrono::Utc::now().timestamp())
    }

    /// Like [`access_token`](Self::access_token) with an explicit clock.
    pub fn access_token_at(&self, now: i64) -> Result<String, SheetsError> {
        // Held across the exchange so concurrent callers share one request.
        let mut cached = self.cached.lock();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let token = self.exchange(now)?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token. The next call re-signs.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    fn exchange(&self, now: i64) -> Result<AccessToken, SheetsError> {
        let assertion = self.signer.sign(&self.token_url, now)?;
        log::debug!("requesting access token for {}", self.signer.issuer());

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| {
                log::warn!("token request failed: {e}");
                SheetsError::TokenExchange { status: None, body: e.to_string() }
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| SheetsError::TokenExchange {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            log::warn!("token endpoint returned {}", status.as_u16());
            return Err(SheetsError::TokenExchange {
                status: Some(status.as_u16()),
                body: truncate_body(&body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| SheetsError::TokenExchange {
            status: Some(status.as_u16()),
            body: format!("invalid token response: {e}"),
        })?;

        let token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SheetsError::TokenExchange {
                status: Some(status.as_u16()),
                body: "token response missing access_token".into(),
            })?;

        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        log::info!("obtained access token (expires in {expires_in}s)");
        Ok(AccessToken { token, expires_at: now + expires_in })
    }
}
