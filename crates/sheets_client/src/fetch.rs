use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

pub const DEFAULT_POLICY_RANGE: &str = "Produção!A:O";
pub const DEFAULT_PAYMENT_RANGE: &str = "Pagamentos!A:J";

/// Anything that can return the rows of a cell range.
pub trait SheetSource {
    fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError>;
}

impl<S: SheetSource + ?Sized> SheetSource for &S {
    fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        (**self).values(spreadsheet_id, range)
    }
}

/// The production (policies) and payments spreadsheet pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetIds {
    pub production: String,
    pub payments: String,
}

impl SheetIds {
    pub fn new(production: impl Into<String>, payments: impl Into<String>) -> Self {
        Self {
            production: production.into().trim().to_string(),
            payments: payments.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), SheetsError> {
        let missing: Vec<&str> = [("production", &self.production), ("payments", &self.payments)]
            .into_iter()
            .filter(|(_, id)| id.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SheetsError::MissingConfiguration(format!(
                "spreadsheet ids not configured: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRanges {
    pub policies: String,
    pub payments: String,
}

impl Default for SheetRanges {
    fn default() -> Self {
        Self {
            policies: DEFAULT_POLICY_RANGE.to_string(),
            payments: DEFAULT_PAYMENT_RANGE.to_string(),
        }
    }
}

/// Data rows of both sheets, header rows removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub policy_rows: Vec<Vec<String>>,
    pub payment_rows: Vec<Vec<String>>,
    pub retrieved_at: DateTime<Utc>,
}

/// Retrieves both sheets. Either both row sets come back or an error does.
pub struct Fetcher<S> {
    source: S,
    ranges: SheetRanges,
}

impl<S: SheetSource> Fetcher<S> {
    pub fn new(source: S, ranges: SheetRanges) -> Self {
        Self { source, ranges }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fetch(&self, ids: &SheetIds) -> Result<RawDataset, SheetsError> {
        ids.validate()?;

        let policy_rows = drop_header(self.source.values(&ids.production, &self.ranges.policies)?);
        let payment_rows = drop_header(self.source.values(&ids.payments, &self.ranges.payments)?);

        log::info!(
            "fetched {} policy rows and {} payment rows",
            policy_rows.len(),
            payment_rows.len()
        );

        Ok(RawDataset {
            policy_rows,
            payment_rows,
            retrieved_at: Utc::now(),
        })
    }
}

fn drop_header(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    if !rows.is_empty() {
        rows.remove(0);
    }
    rows
}
