//! Report session: filter-driven fetch cycles producing immutable snapshots
//!
//! A cycle is `begin` (issue a ticket for the new filter set), `fetch` (run
//! all fetchers concurrently) and `apply` (fold the outcome into a new
//! snapshot). Each ticket carries a generation number; an outcome whose
//! generation has been superseded is discarded on `apply`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::services::comparison::ComparisonSynthesizer;
use crate::services::fetcher::{Fetched, RecordFetcher};
use crate::services::Aggregator;
use crate::types::{
    ComparisonRow, ComparisonSummary, Deposit, DonationRecord, Entity, FetchError,
    InventorySnapshot, MovementRecord, Overview, ReportFilters, RequestRecord, ResolutionGap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// At least one fetcher failed in the last applied cycle
    Error,
}

/// Immutable view of the session after a command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSnapshot {
    pub generation: u64,
    pub filters: ReportFilters,
    pub status: SessionStatus,
    pub inventory: Vec<InventorySnapshot>,
    pub donations: Vec<DonationRecord>,
    pub requests: Vec<RequestRecord>,
    pub movements: Vec<MovementRecord>,
    pub deposits: Vec<Deposit>,
    pub comparison: Vec<ComparisonRow>,
    /// Failures of the last applied cycle
    pub failures: Vec<FetchError>,
    /// Unresolved references in the records currently held, replaced per
    /// entity whenever that entity loads
    pub gaps: Vec<ResolutionGap>,
    #[serde(skip)]
    loaded: HashSet<Entity>,
}

impl ReportSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    /// Whether `entity` has loaded successfully at least once
    pub fn has_loaded(&self, entity: Entity) -> bool {
        self.loaded.contains(&entity)
    }

    /// Every fetcher failed in the last applied cycle
    pub fn all_failed(&self) -> bool {
        self.failures.len() == Entity::ALL.len()
    }

    /// One-line description of the failures, if any
    pub fn error(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn overview(&self) -> Overview {
        Aggregator::overview(&self.inventory, &self.donations, &self.requests)
    }

    pub fn comparison_summary(&self) -> ComparisonSummary {
        ComparisonSynthesizer::summary(&self.comparison)
    }
}

/// Handle for one fetch cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub filters: ReportFilters,
}

/// Settled results of every fetcher for one ticket
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub inventory: Fetched<InventorySnapshot>,
    pub donations: Fetched<DonationRecord>,
    pub requests: Fetched<RequestRecord>,
    pub movements: Fetched<MovementRecord>,
    pub deposits: Fetched<Deposit>,
}

pub struct ReportSession {
    fetcher: Arc<RecordFetcher>,
    snapshot: Arc<ReportSnapshot>,
}

impl ReportSession {
    pub fn new(fetcher: RecordFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            snapshot: Arc::new(ReportSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> Arc<ReportSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn fetcher(&self) -> Arc<RecordFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Enter `Loading` for `filters` and supersede any cycle in flight
    pub fn begin(&mut self, filters: ReportFilters) -> FetchTicket {
        let mut next = (*self.snapshot).clone();
        next.generation += 1;
        next.filters = filters.clone();
        next.status = SessionStatus::Loading;

        let ticket = FetchTicket {
            generation: next.generation,
            filters,
        };
        self.snapshot = Arc::new(next);
        ticket
    }

    /// Enter `Loading` again with the current filters
    pub fn begin_refresh(&mut self) -> FetchTicket {
        let filters = self.snapshot.filters.clone();
        self.begin(filters)
    }

    /// Run every fetcher for `ticket` concurrently and wait for all to settle
    pub async fn fetch(fetcher: &RecordFetcher, ticket: &FetchTicket) -> FetchOutcome {
        let filters = &ticket.filters;
        let (inventory, donations, requests, movements, deposits) = tokio::join!(
            fetcher.fetch_inventory(filters),
            fetcher.fetch_donations(filters),
            fetcher.fetch_requests(filters),
            fetcher.fetch_movements(filters),
            fetcher.fetch_deposits(),
        );
        FetchOutcome {
            generation: ticket.generation,
            inventory,
            donations,
            requests,
            movements,
            deposits,
        }
    }

    /// Fold `outcome` into a new snapshot.
    ///
    /// Returns false (and changes nothing) when the outcome belongs to a
    /// superseded ticket. A failed entity keeps its last-known-good records.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.generation != self.snapshot.generation {
            log::debug!(
                "discarding stale fetch outcome (generation {}, current {})",
                outcome.generation,
                self.snapshot.generation
            );
            return false;
        }

        let mut next = (*self.snapshot).clone();
        next.failures.clear();

        let donations_changed = outcome.donations.is_ok();
        let requests_changed = outcome.requests.is_ok();

        settle(&mut next, Entity::Inventory, outcome.inventory, |s| &mut s.inventory);
        settle(&mut next, Entity::Donations, outcome.donations, |s| &mut s.donations);
        settle(&mut next, Entity::Requests, outcome.requests, |s| &mut s.requests);
        settle(&mut next, Entity::Movements, outcome.movements, |s| &mut s.movements);
        settle(&mut next, Entity::Deposits, outcome.deposits, |s| &mut s.deposits);

        let comparable = next.has_loaded(Entity::Donations) && next.has_loaded(Entity::Requests);
        if comparable && (donations_changed || requests_changed) {
            next.comparison = ComparisonSynthesizer::synthesize(&next.donations, &next.requests);
        }

        next.status = if next.failures.is_empty() {
            SessionStatus::Ready
        } else {
            SessionStatus::Error
        };
        self.snapshot = Arc::new(next);
        true
    }

    /// Replace the filters and run a full cycle
    pub async fn set_filters(&mut self, filters: ReportFilters) -> Arc<ReportSnapshot> {
        let ticket = self.begin(filters);
        self.run(ticket).await
    }

    /// Re-run a full cycle with the current filters
    pub async fn refresh(&mut self) -> Arc<ReportSnapshot> {
        let ticket = self.begin_refresh();
        self.run(ticket).await
    }

    async fn run(&mut self, ticket: FetchTicket) -> Arc<ReportSnapshot> {
        let fetcher = self.fetcher();
        let outcome = Self::fetch(&fetcher, &ticket).await;
        self.apply(outcome);
        self.snapshot()
    }
}

fn settle<T, F>(snapshot: &mut ReportSnapshot, entity: Entity, fetched: Fetched<T>, slot: F)
where
    F: Fn(&mut ReportSnapshot) -> &mut Vec<T>,
{
    match fetched {
        Ok(resolution) => {
            *slot(snapshot) = resolution.records;
            snapshot.gaps.retain(|gap| gap.entity != entity);
            snapshot.gaps.extend(resolution.gaps);
            snapshot.loaded.insert(entity);
        }
        Err(error) => snapshot.failures.push(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::FallbackLabels;
    use crate::store::{Collection, JsonStore, Query, ReportStore};
    use crate::types::{ReportError, Result};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    /// Store whose collections can be switched to failing between cycles
    struct FlakyStore {
        inner: JsonStore,
        failing: Mutex<HashSet<Collection>>,
    }

    impl FlakyStore {
        fn fail(&self, collection: Collection) {
            self.failing.lock().unwrap().insert(collection);
        }

        fn recover(&self, collection: Collection) {
            self.failing.lock().unwrap().remove(&collection);
        }

        fn fail_all(&self) {
            self.failing.lock().unwrap().extend(Collection::ALL);
        }
    }

    #[async_trait]
    impl ReportStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
            if self.failing.lock().unwrap().contains(&collection) {
                return Err(ReportError::Store(format!("{} unavailable", collection)));
            }
            self.inner.select(collection, query).await
        }
    }

    fn make_store() -> Arc<FlakyStore> {
        let mut tables = HashMap::new();
        tables.insert(
            Collection::Donations,
            vec![
                json!({ "id_producto": "p1", "nombre_producto": "Arroz", "cantidad": 5,
                        "fecha_donacion": "2024-01-05T10:00:00Z" }),
                json!({ "id_producto": "p2", "nombre_producto": "Leche", "cantidad": 8,
                        "fecha_donacion": "2024-02-05T10:00:00Z" }),
            ],
        );
        tables.insert(
            Collection::Requests,
            vec![
                json!({ "id": 1, "tipo_alimento": "granos", "cantidad": 4, "usuario_id": "u9",
                        "estado": "atendido", "created_at": "2024-01-10T00:00:00Z" }),
                json!({ "id": 2, "tipo_alimento": "granos", "cantidad": 6,
                        "estado": "pendiente", "created_at": "2024-02-10T00:00:00Z" }),
            ],
        );
        tables.insert(
            Collection::Deposits,
            vec![json!({ "id_deposito": "d1", "nombre": "Central" })],
        );
        Arc::new(FlakyStore {
            inner: JsonStore::from_tables(tables),
            failing: Mutex::new(HashSet::new()),
        })
    }

    fn make_session(store: Arc<FlakyStore>) -> ReportSession {
        ReportSession::new(RecordFetcher::new(store, FallbackLabels::default()))
    }

    fn january() -> ReportFilters {
        ReportFilters::new().with_date_range(
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()),
        )
    }

    fn february() -> ReportFilters {
        ReportFilters::new().with_date_range(
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()),
        )
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = make_session(make_store());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.comparison.is_empty());
    }

    #[test]
    fn test_begin_enters_loading() {
        let mut session = make_session(make_store());
        let ticket = session.begin(january());

        let snapshot = session.snapshot();
        assert!(snapshot.is_loading());
        assert_eq!(ticket.generation, 1);
        assert_eq!(snapshot.filters, january());
    }

    #[tokio::test]
    async fn test_set_filters_loads_everything() {
        let mut session = make_session(make_store());
        let snapshot = session.set_filters(ReportFilters::new()).await;

        assert_eq!(snapshot.status, SessionStatus::Ready);
        assert_eq!(snapshot.donations.len(), 2);
        assert_eq!(snapshot.requests.len(), 2);
        assert_eq!(snapshot.deposits.len(), 1);
        assert!(snapshot.error().is_none());
        for entity in Entity::ALL {
            assert!(snapshot.has_loaded(entity));
        }
        assert_eq!(snapshot.comparison.len(), 2);
        assert_eq!(snapshot.comparison[0].fulfilled, 4.0);
    }

    #[tokio::test]
    async fn test_stale_outcome_is_discarded() {
        let mut session = make_session(make_store());
        let fetcher = session.fetcher();

        let old = session.begin(january());
        let new = session.begin(february());

        // The newer fetch settles first, the older one arrives late
        let new_outcome = ReportSession::fetch(&fetcher, &new).await;
        let old_outcome = ReportSession::fetch(&fetcher, &old).await;

        assert!(session.apply(new_outcome));
        assert!(!session.apply(old_outcome));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.filters, february());
        assert_eq!(snapshot.donations.len(), 1);
        assert_eq!(snapshot.donations[0].product_name, "Leche");
        assert_eq!(snapshot.comparison.len(), 1);
        assert_eq!(snapshot.comparison[0].period.key(), "2024-02");
    }

    #[tokio::test]
    async fn test_outcome_superseded_before_settling_is_discarded() {
        let mut session = make_session(make_store());
        let fetcher = session.fetcher();

        let old = session.begin(january());
        let old_outcome = ReportSession::fetch(&fetcher, &old).await;
        session.begin(february());

        assert!(!session.apply(old_outcome));
        assert!(session.snapshot().is_loading());
        assert!(session.snapshot().donations.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_last_known_good() {
        let store = make_store();
        let mut session = make_session(store.clone());
        session.set_filters(ReportFilters::new()).await;

        store.fail(Collection::Requests);
        let snapshot = session.set_filters(january()).await;

        assert_eq!(snapshot.status, SessionStatus::Error);
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.failures[0].entity, Entity::Requests);
        assert!(snapshot.error().unwrap().contains("requests"));
        // Requests still hold the previous cycle's data
        assert_eq!(snapshot.requests.len(), 2);
        // Donations reflect the new filter
        assert_eq!(snapshot.donations.len(), 1);
        assert!(!snapshot.all_failed());
    }

    #[tokio::test]
    async fn test_gaps_follow_retained_records() {
        let store = make_store();
        let mut session = make_session(store.clone());
        let requester_gap = ResolutionGap {
            entity: Entity::Requests,
            id: "u9".into(),
        };

        let snapshot = session.set_filters(ReportFilters::new()).await;
        assert_eq!(snapshot.gaps, vec![requester_gap.clone()]);

        // Requests keep last cycle's records, so their gaps stay too
        store.fail(Collection::Requests);
        let snapshot = session.refresh().await;
        assert_eq!(snapshot.requests.len(), 2);
        assert_eq!(snapshot.gaps, vec![requester_gap]);

        // A successful reload replaces them
        store.recover(Collection::Requests);
        let snapshot = session.set_filters(february()).await;
        assert_eq!(snapshot.requests.len(), 1);
        assert!(snapshot.gaps.is_empty());
    }

    #[tokio::test]
    async fn test_comparison_waits_for_both_sides() {
        let store = make_store();
        store.fail(Collection::Requests);
        let mut session = make_session(store);

        let snapshot = session.refresh().await;

        assert!(snapshot.has_loaded(Entity::Donations));
        assert!(!snapshot.has_loaded(Entity::Requests));
        assert!(snapshot.comparison.is_empty());
    }

    #[tokio::test]
    async fn test_comparison_recomputed_when_donations_change() {
        let store = make_store();
        let mut session = make_session(store.clone());
        session.set_filters(ReportFilters::new()).await;

        store.fail(Collection::Requests);
        let snapshot = session.set_filters(january()).await;

        // Donations narrowed to January, requests kept from the full range
        let january_row = &snapshot.comparison[0];
        assert_eq!(january_row.donations, 5.0);
        assert_eq!(snapshot.comparison[1].donations, 0.0);
        assert_eq!(snapshot.comparison[1].requests, 6.0);
    }

    #[tokio::test]
    async fn test_refresh_reuses_filters() {
        let mut session = make_session(make_store());
        session.set_filters(january()).await;

        let snapshot = session.refresh().await;

        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.filters, january());
        assert_eq!(snapshot.status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_fixture_dataset_end_to_end() {
        let store = JsonStore::open(Path::new("tests/fixtures/dataset")).unwrap();
        let fetcher = RecordFetcher::new(Arc::new(store), FallbackLabels::default());
        let mut session = ReportSession::new(fetcher);

        let snapshot = session.set_filters(ReportFilters::new()).await;

        assert_eq!(snapshot.status, SessionStatus::Ready);
        assert_eq!(snapshot.donations.len(), 5);
        assert_eq!(snapshot.requests.len(), 4);
        assert_eq!(snapshot.inventory.len(), 4);
        assert_eq!(snapshot.movements.len(), 3);
        assert_eq!(snapshot.deposits.len(), 2);

        let periods: Vec<String> = snapshot.comparison.iter().map(|r| r.period.key()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(snapshot.comparison[0].donations, 35.0);
        assert_eq!(snapshot.comparison[0].requests, 16.0);
        assert_eq!(snapshot.comparison[0].fulfilled, 16.0);
        assert_eq!(snapshot.comparison_summary().mean_efficiency, 33);

        let overview = snapshot.overview();
        assert_eq!(overview.total_inventory, 92.0);
        assert_eq!(overview.pending_requests, 1);
        assert_eq!(overview.active_users, 5);

        let m503 = &snapshot.movements[2];
        assert_eq!(m503.donor_name, "Unknown user");
        assert_eq!(m503.requester_name, "Hogar Esperanza");
        assert_eq!(snapshot.movements[1].details.len(), 2);
        assert_eq!(snapshot.inventory[3].deposit_name, "No deposit");
        assert_eq!(snapshot.gaps.len(), 3);

        let by_day = Aggregator::donations_by_day(&snapshot.donations);
        assert_eq!(by_day.len(), 3);
        assert_eq!(by_day[0].quantity, 35.0);
        assert_eq!(by_day[0].count, 2);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let store = make_store();
        store.fail_all();
        let mut session = make_session(store);

        let snapshot = session.refresh().await;

        assert_eq!(snapshot.status, SessionStatus::Error);
        assert!(snapshot.all_failed());
    }
}
