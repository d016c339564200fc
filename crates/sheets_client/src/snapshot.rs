use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use comrec_recon::{
    normalize_payments, normalize_policies, reconcile, PaymentRecord, PolicyRecord, Reconciliation,
    RepairStats,
};
use parking_lot::RwLock;
use serde::Serializer;

use crate::fetch::{RawDataset, SheetIds};

/// Normalized records from one successful fetch. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub policies: Vec<PolicyRecord>,
    pub payments: Vec<PaymentRecord>,
    pub last_updated: DateTime<Utc>,
    pub repairs: RepairStats,
}

impl Snapshot {
    pub fn from_raw(raw: &RawDataset) -> Self {
        let policies = normalize_policies(&raw.policy_rows);
        let payments = normalize_payments(&raw.payment_rows);
        let mut repairs = policies.repairs;
        repairs += payments.repairs;
        Self {
            policies: policies.records,
            payments: payments.records,
            last_updated: raw.retrieved_at,
            repairs,
        }
    }

    pub fn reconcile(&self) -> Reconciliation {
        reconcile(&self.policies, &self.payments)
    }
}

/// Holds the latest snapshot per sheet pair. Readers get an `Arc` and never
/// observe a half-replaced value.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<HashMap<SheetIds, Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, ids: &SheetIds) -> Option<Arc<Snapshot>> {
        self.current.read().get(ids).cloned()
    }

    pub fn replace(&self, ids: &SheetIds, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.write().insert(ids.clone(), Arc::clone(&snapshot));
        snapshot
    }
}

/// RFC 3339 UTC with millisecond precision (`2025-01-15T12:00:00.000Z`).
pub(crate) fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
