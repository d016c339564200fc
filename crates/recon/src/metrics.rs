use crate::classify::received_percentage;
use crate::model::{CommissionStatus, CommissionSummary, Money, SummaryMetrics};

/// Totals and per-status counts across summaries.
pub fn compute_metrics(summaries: &[CommissionSummary]) -> SummaryMetrics {
    let mut received = 0;
    let mut partial = 0;
    let mut pending = 0;

    for s in summaries {
        match s.status {
            CommissionStatus::Received => received += 1,
            CommissionStatus::Partial => partial += 1,
            CommissionStatus::Pending => pending += 1,
        }
    }

    let total_expected: Money = summaries.iter().map(|s| s.expected).sum();
    let total_received: Money = summaries.iter().map(|s| s.received).sum();

    SummaryMetrics {
        total_clients: summaries.len(),
        received,
        partial,
        pending,
        total_expected,
        total_received,
        overall_pct: received_percentage(total_received, total_expected),
    }
}
