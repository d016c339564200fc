//! Retrieval boundary: refresh a snapshot and render the response record.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use comrec_recon::{PaymentRecord, PolicyRecord, RecordSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;
use crate::fetch::{Fetcher, SheetIds, SheetRanges, SheetSource};
use crate::snapshot::{serialize_timestamp, Snapshot, SnapshotStore};

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Fetch completed and the store now holds this snapshot.
    Updated(Arc<Snapshot>),
    /// A refresh for the same sheets was already running; this trigger was dropped.
    Absorbed,
}

/// Body of the retrieval response. Errors carry empty record lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub policies: Vec<PolicyRecord>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl RetrievalBody {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            error: None,
            policies: snapshot.policies.clone(),
            payments: snapshot.payments.clone(),
            last_updated: snapshot.last_updated,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            policies: Vec::new(),
            payments: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn into_record_set(self) -> RecordSet {
        RecordSet {
            policies: self.policies,
            payments: self.payments,
            ..RecordSet::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResponse {
    /// 200 success, 400 missing configuration, 500 any other failure.
    pub status: u16,
    pub body: RetrievalBody,
}

impl RetrievalResponse {
    fn error(err: &SheetsError) -> Self {
        Self {
            status: err.http_status(),
            body: RetrievalBody::failure(err.to_string()),
        }
    }
}

/// Releases the in-flight slot on every exit path.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<SheetIds>>,
    ids: SheetIds,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.ids);
    }
}

/// Fetches sheets into a [`SnapshotStore`], one refresh at a time per sheet pair.
pub struct RetrievalService<S> {
    fetcher: Fetcher<S>,
    store: SnapshotStore,
    in_flight: Mutex<HashSet<SheetIds>>,
}

impl<S: SheetSource> RetrievalService<S> {
    pub fn new(source: S, ranges: SheetRanges) -> Self {
        Self {
            fetcher: Fetcher::new(source, ranges),
            store: SnapshotStore::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn latest(&self, ids: &SheetIds) -> Option<Arc<Snapshot>> {
        self.store.latest(ids)
    }

    /// Fetch and swap in a new snapshot. A failed fetch leaves the previous
    /// snapshot in place.
    pub fn refresh(&self, ids: &SheetIds) -> Result<RefreshOutcome, SheetsError> {
        ids.validate()?;

        let _guard = {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(ids.clone()) {
                log::debug!("refresh already in flight; trigger absorbed");
                return Ok(RefreshOutcome::Absorbed);
            }
            FlightGuard { in_flight: &self.in_flight, ids: ids.clone() }
        };

        let raw = self.fetcher.fetch(ids).map_err(|e| {
            log::error!("refresh failed: {e}");
            e
        })?;
        let snapshot = self.store.replace(ids, Snapshot::from_raw(&raw));
        log::info!(
            "snapshot updated: {} policies, {} payments",
            snapshot.policies.len(),
            snapshot.payments.len()
        );
        Ok(RefreshOutcome::Updated(snapshot))
    }

    /// Refresh and return the body to serve. An absorbed trigger serves the
    /// latest snapshot of the same sheet pair when there is one.
    pub fn retrieve(&self, ids: Option<&SheetIds>) -> Result<RetrievalBody, SheetsError> {
        let ids = ids.ok_or_else(|| {
            SheetsError::MissingConfiguration("spreadsheet ids not configured".into())
        })?;

        let snapshot = match self.refresh(ids)? {
            RefreshOutcome::Updated(snapshot) => snapshot,
            RefreshOutcome::Absorbed => self.store.latest(ids).ok_or(SheetsError::RefreshInProgress)?,
        };
        Ok(RetrievalBody::from_snapshot(&snapshot))
    }

    /// [`retrieve`](Self::retrieve) rendered as a response record. `None`
    /// means the caller has no sheet ids configured.
    pub fn respond(&self, ids: Option<&SheetIds>) -> RetrievalResponse {
        match self.retrieve(ids) {
            Ok(body) => RetrievalResponse { status: 200, body },
            Err(err) => RetrievalResponse::error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sheet(id: &str) -> Vec<Vec<String>> {
        match id {
            id if id.starts_with("prod") => vec![
                row(&["header"]),
                row(&["02/01/2025", "02/01/2026", "225802", "IRACI", "BRADESCO", "10", "1548,98", "154,90", "108,43", "Renovação"]),
            ],
            _ => vec![
                row(&["header"]),
                row(&["IRACI", "BRADESCO", "225802", "1", "15/01/2025", "20/01/2025", "15,49", "10,84"]),
            ],
        }
    }

    /// Serves fixed rows; fails while `failing` is set.
    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl SheetSource for FakeSource {
        fn values(&self, id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(SheetsError::SourceUnavailable {
                    sheet: range.into(),
                    status: Some(503),
                    message: "backend error".into(),
                });
            }
            Ok(sheet(id))
        }
    }

    /// Blocks inside the first call for sheet `gate` until released.
    struct BlockingSource {
        gate: &'static str,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
        calls: AtomicUsize,
    }

    impl SheetSource for BlockingSource {
        fn values(&self, id: &str, _range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let entered = if id == self.gate { self.entered.lock().take() } else { None };
            if let Some(entered) = entered {
                entered.send(()).unwrap();
                self.release.lock().recv_timeout(Duration::from_secs(10)).unwrap();
            }
            Ok(sheet(id))
        }
    }

    fn ids() -> SheetIds {
        SheetIds::new("prod", "pay")
    }

    #[test]
    fn success_response() {
        let service = RetrievalService::new(FakeSource::default(), SheetRanges::default());
        let resp = service.respond(Some(&ids()));
        assert_eq!(resp.status, 200);
        assert!(resp.body.error.is_none());
        assert_eq!(resp.body.policies.len(), 1);
        assert_eq!(resp.body.payments.len(), 1);

        let json = serde_json::to_value(&resp.body).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["policies"][0]["apolice"], "225802");
        assert!(json["lastUpdated"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn missing_ids_is_400() {
        let service = RetrievalService::new(FakeSource::default(), SheetRanges::default());
        let resp = service.respond(None);
        assert_eq!(resp.status, 400);
        assert!(resp.body.error.as_deref().unwrap().contains("not configured"));

        let resp = service.respond(Some(&SheetIds::new("prod", " ")));
        assert_eq!(resp.status, 400);
        assert_eq!(service.fetcher.source().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let service = RetrievalService::new(FakeSource::default(), SheetRanges::default());
        let first = match service.refresh(&ids()).unwrap() {
            RefreshOutcome::Updated(s) => s,
            RefreshOutcome::Absorbed => panic!("nothing else in flight"),
        };

        service.fetcher.source().failing.store(true, Ordering::SeqCst);
        let resp = service.respond(Some(&ids()));
        assert_eq!(resp.status, 500);
        assert!(resp.body.policies.is_empty());
        assert!(resp.body.error.as_deref().unwrap().contains("HTTP 503"));

        assert!(Arc::ptr_eq(&first, &service.latest(&ids()).unwrap()));

        // The guard was released on the error path.
        service.fetcher.source().failing.store(false, Ordering::SeqCst);
        assert!(matches!(service.refresh(&ids()).unwrap(), RefreshOutcome::Updated(_)));
    }

    #[test]
    fn concurrent_trigger_is_absorbed() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = BlockingSource {
            gate: "prod",
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        };
        let service = RetrievalService::new(source, SheetRanges::default());

        std::thread::scope(|scope| {
            let first = scope.spawn(|| service.refresh(&ids()));
            entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();

            // First refresh is parked inside the fetch.
            assert!(matches!(service.refresh(&ids()).unwrap(), RefreshOutcome::Absorbed));
            let resp = service.respond(Some(&ids()));
            assert_eq!(resp.status, 500);
            assert_eq!(resp.body.error.as_deref(), Some("refresh already in progress"));

            release_tx.send(()).unwrap();
            assert!(matches!(first.join().unwrap().unwrap(), RefreshOutcome::Updated(_)));
        });

        // One fetch = two sheet calls.
        assert_eq!(service.fetcher.source().calls.load(Ordering::SeqCst), 2);
        assert!(matches!(service.refresh(&ids()).unwrap(), RefreshOutcome::Updated(_)));
    }

    #[test]
    fn absorbed_trigger_never_serves_another_pair() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = BlockingSource {
            gate: "prod-b",
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        };
        let service = RetrievalService::new(source, SheetRanges::default());
        let a = SheetIds::new("prod-a", "pay-a");
        let b = SheetIds::new("prod-b", "pay-b");
        assert_eq!(service.respond(Some(&a)).status, 200);

        std::thread::scope(|scope| {
            let first = scope.spawn(|| service.refresh(&b));
            entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();

            // Pair A has a snapshot, pair B does not yet.
            let resp = service.respond(Some(&b));
            assert_eq!(resp.status, 500);
            assert_eq!(resp.body.error.as_deref(), Some("refresh already in progress"));
            assert!(resp.body.policies.is_empty());

            release_tx.send(()).unwrap();
            assert!(matches!(first.join().unwrap().unwrap(), RefreshOutcome::Updated(_)));
        });

        assert!(service.latest(&b).is_some());
        assert!(!Arc::ptr_eq(&service.latest(&a).unwrap(), &service.latest(&b).unwrap()));
    }

    #[test]
    fn body_roundtrips_for_saved_snapshots() {
        let service = RetrievalService::new(FakeSource::default(), SheetRanges::default());
        let resp = service.respond(Some(&ids()));
        let text = serde_json::to_string(&resp.body).unwrap();
        let back: RetrievalBody = serde_json::from_str(&text).unwrap();
        let set = back.into_record_set();
        assert_eq!(set.policies, resp.body.policies);
        assert_eq!(set.payments, resp.body.payments);
    }
}
