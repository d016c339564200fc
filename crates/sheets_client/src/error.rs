use std::fmt;

/// Error type for credential exchange and sheet retrieval.
#[derive(Debug)]
pub enum SheetsError {
    /// Service-account credentials absent or unusable. Needs operator action.
    Configuration(String),
    /// Spreadsheet ids not configured for the caller.
    MissingConfiguration(String),
    /// Token endpoint call failed. `status` is absent for transport errors.
    TokenExchange { status: Option<u16>, body: String },
    /// Sheet values call failed or timed out.
    SourceUnavailable { sheet: String, status: Option<u16>, message: String },
    /// Another refresh holds the slot and no earlier snapshot exists.
    RefreshInProgress,
}

impl SheetsError {
    /// Transient failures; the next refresh cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TokenExchange { .. } | Self::SourceUnavailable { .. } | Self::RefreshInProgress
        )
    }

    /// Status code reported by the retrieval boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingConfiguration(_) => 400,
            _ => 500,
        }
    }
}

impl fmt::Display for SheetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "service account not configured: {msg}"),
            Self::MissingConfiguration(msg) => write!(f, "{msg}"),
            Self::TokenExchange { status: Some(code), body } => {
                write!(f, "failed to get access token: HTTP {code}: {body}")
            }
            Self::TokenExchange { status: None, body } => {
                write!(f, "failed to get access token: {body}")
            }
            Self::SourceUnavailable { sheet, status: Some(code), message } => {
                write!(f, "sheet '{sheet}' unavailable: HTTP {code}: {message}")
            }
            Self::SourceUnavailable { sheet, status: None, message } => {
                write!(f, "sheet '{sheet}' unavailable: {message}")
            }
            Self::RefreshInProgress => write!(f, "refresh already in progress"),
        }
    }
}

impl std::error::Error for SheetsError {}

/// Keep upstream bodies short enough for logs and error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let body = body.trim();
    match body.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(SheetsError::MissingConfiguration("x".into()).http_status(), 400);
        assert_eq!(SheetsError::Configuration("x".into()).http_status(), 500);
        let err = SheetsError::SourceUnavailable { sheet: "Pagamentos".into(), status: Some(403), message: "denied".into() };
        assert_eq!(err.http_status(), 500);
        assert!(err.is_retryable());
        assert!(!SheetsError::Configuration("x".into()).is_retryable());
    }

    #[test]
    fn display_includes_status_and_sheet() {
        let err = SheetsError::SourceUnavailable { sheet: "Produção".into(), status: Some(404), message: "not found".into() };
        assert_eq!(err.to_string(), "sheet 'Produção' unavailable: HTTP 404: not found");
        let err = SheetsError::TokenExchange { status: Some(400), body: "invalid_grant".into() };
        assert_eq!(err.to_string(), "failed to get access token: HTTP 400: invalid_grant");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "çã".repeat(300);
        let short = truncate_body(&long);
        assert_eq!(short.chars().count(), 201);
        assert_eq!(truncate_body("  ok  "), "ok");
    }
}
