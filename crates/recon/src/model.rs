use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::key::ReconciliationKey;
use crate::normalize::RepairStats;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Amount in minor units (centavos). Serialized as a decimal JSON number.
/// Addition saturates at the `i64` bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Round a decimal amount to the nearest cent. Non-finite input is zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self((value * 100.0).round() as i64)
        } else {
            Self::ZERO
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Money::from_f64)
    }
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One row of the production sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRecord {
    #[serde(rename = "vigenciaInicio")]
    pub effective_start: String,
    #[serde(rename = "vigenciaFim")]
    pub effective_end: String,
    /// May be empty (e.g. renewals without a number yet).
    #[serde(rename = "apolice")]
    pub policy_id: String,
    #[serde(rename = "segurado")]
    pub insured: String,
    #[serde(rename = "seguradora")]
    pub insurer: String,
    #[serde(rename = "parcelas")]
    pub installments: u32,
    #[serde(rename = "premioLiquido")]
    pub net_premium: Money,
    #[serde(rename = "comissao100")]
    pub full_commission: Money,
    #[serde(rename = "comissaoPrevista")]
    pub expected_commission: Money,
    #[serde(rename = "tipo")]
    pub policy_type: String,
}

/// One row of the payments sheet (one installment paid).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentRecord {
    #[serde(rename = "segurado")]
    pub insured: String,
    #[serde(rename = "seguradora")]
    pub insurer: String,
    #[serde(rename = "apolice")]
    pub policy_id: String,
    #[serde(rename = "parcela")]
    pub installment: u32,
    #[serde(rename = "pgtoSeguradora")]
    pub insurer_paid_on: String,
    #[serde(rename = "pgtoColaborador")]
    pub collaborator_paid_on: String,
    #[serde(rename = "comissao100")]
    pub full_commission: Money,
    #[serde(rename = "comissaoRecebida")]
    pub received_commission: Money,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Received,
    Partial,
    Pending,
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Partial => write!(f, "partial"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rendered in place of an empty policy identifier.
pub const MISSING_POLICY_ID: &str = "N/A";

/// Expected vs received commission for one reconciliation key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionSummary {
    #[serde(skip)]
    pub key: ReconciliationKey,
    #[serde(rename = "segurado")]
    pub insured: String,
    #[serde(rename = "apolice", serialize_with = "serialize_policy_id")]
    pub policy_id: String,
    #[serde(rename = "seguradora")]
    pub insurer: String,
    #[serde(rename = "comissaoPrevista")]
    pub expected: Money,
    #[serde(rename = "comissaoRecebida")]
    pub received: Money,
    #[serde(rename = "percentualRecebido")]
    pub received_pct: f64,
    pub status: CommissionStatus,
    #[serde(rename = "parcelas")]
    pub installments: u32,
    /// Collaborator-payment date of the last payment visited for this key.
    #[serde(rename = "ultimoPagamento", skip_serializing_if = "Option::is_none")]
    pub last_payment: Option<String>,
}

impl CommissionSummary {
    /// Policy identifier for display, `N/A` when the policy had none.
    pub fn display_policy_id(&self) -> &str {
        if self.policy_id.is_empty() {
            MISSING_POLICY_ID
        } else {
            &self.policy_id
        }
    }
}

fn serialize_policy_id<S: Serializer>(policy_id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if policy_id.is_empty() {
        serializer.serialize_str(MISSING_POLICY_ID)
    } else {
        serializer.serialize_str(policy_id)
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// In first-seen policy order. Callers needing a stable order sort explicitly.
    pub summaries: Vec<CommissionSummary>,
    /// Payments whose key matched no policy. They contribute to no summary.
    pub unmatched_payments: usize,
}

/// Totals across all summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub total_clients: usize,
    pub received: usize,
    pub partial: usize,
    pub pending: usize,
    pub total_expected: Money,
    pub total_received: Money,
    pub overall_pct: f64,
}

/// Normalized input for one reconciliation pass, as produced by a fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSet {
    pub policies: Vec<PolicyRecord>,
    pub payments: Vec<PaymentRecord>,
    #[serde(skip)]
    pub repairs: RepairStats,
}
