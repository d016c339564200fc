//! `comrec-recon` — commission reconciliation engine.
//!
//! Pure engine crate: receives raw sheet rows or typed records, returns
//! per-policy commission summaries. No network or filesystem access.

pub mod classify;
pub mod engine;
pub mod key;
pub mod metrics;
pub mod model;
pub mod normalize;

pub use engine::{reconcile, sort_by_insured, sort_payments_by_date};
pub use key::{Keyed, ReconciliationKey};
pub use metrics::compute_metrics;
pub use model::{
    CommissionStatus, CommissionSummary, Money, PaymentRecord, PolicyRecord, Reconciliation,
    RecordSet, SummaryMetrics,
};
pub use normalize::{normalize_payments, normalize_policies, Normalized, RepairStats};
