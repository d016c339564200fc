use std::collections::HashMap;

use crate::classify::received_percentage;
use crate::key::{Keyed, ReconciliationKey};
use crate::model::{CommissionStatus, CommissionSummary, PaymentRecord, PolicyRecord, Reconciliation};
use crate::normalize::parse_sheet_date;

/// Join policies and payments by reconciliation key.
///
/// Policies sharing a key collapse into one summary whose expected amount is
/// their sum. A payment only counts toward an existing policy key; payments
/// with no matching policy are dropped. The most recent payment date is the
/// collaborator date of the last payment visited for that key, in input order.
pub fn reconcile(policies: &[PolicyRecord], payments: &[PaymentRecord]) -> Reconciliation {
    let mut index: HashMap<ReconciliationKey, usize> = HashMap::new();
    let mut summaries: Vec<CommissionSummary> = Vec::new();

    for policy in policies {
        let key = policy.reconciliation_key();
        match index.get(&key) {
            Some(&i) => summaries[i].expected += policy.expected_commission,
            None => {
                index.insert(key.clone(), summaries.len());
                summaries.push(seed_summary(key, policy));
            }
        }
    }

    let mut unmatched_payments = 0;
    for payment in payments {
        match index.get(&payment.reconciliation_key()) {
            Some(&i) => {
                let summary = &mut summaries[i];
                summary.received += payment.received_commission;
                summary.last_payment = Some(payment.collaborator_paid_on.clone());
            }
            None => unmatched_payments += 1,
        }
    }

    for summary in &mut summaries {
        summary.received_pct = received_percentage(summary.received, summary.expected);
        summary.status = CommissionStatus::from_percentage(summary.received_pct);
    }

    if unmatched_payments > 0 {
        log::debug!("{unmatched_payments} payment(s) matched no policy and were ignored");
    }

    Reconciliation { summaries, unmatched_payments }
}

fn seed_summary(key: ReconciliationKey, policy: &PolicyRecord) -> CommissionSummary {
    CommissionSummary {
        key,
        insured: policy.insured.trim().to_string(),
        policy_id: policy.policy_id.trim().to_string(),
        insurer: policy.insurer.trim().to_string(),
        expected: policy.expected_commission,
        received: Default::default(),
        received_pct: 0.0,
        status: CommissionStatus::Pending,
        installments: policy.installments,
        last_payment: None,
    }
}

/// Sort by insured, then insurer, then policy id.
pub fn sort_by_insured(summaries: &mut [CommissionSummary]) {
    summaries.sort_by(|a, b| {
        a.insured
            .cmp(&b.insured)
            .then_with(|| a.insurer.cmp(&b.insurer))
            .then_with(|| a.policy_id.cmp(&b.policy_id))
    });
}

/// Stable sort by collaborator-payment date; unparseable dates first.
///
/// Feed the result to [`reconcile`] when "most recent payment" should mean
/// the chronologically latest one rather than the last row.
pub fn sort_payments_by_date(payments: &mut [PaymentRecord]) {
    payments.sort_by_key(|p| parse_sheet_date(&p.collaborator_paid_on));
}
