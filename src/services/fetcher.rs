//! Record fetchers
//!
//! Each entity is loaded as a pipeline: fetch raw rows with server-side
//! predicates, collect the referenced ids, resolve them with one batched
//! lookup per referenced collection, then annotate. The annotate stages are
//! plain functions over rows so they can be tested without a store.
//!
//! Every `fetch_*` method converts its failure into a [`FetchError`] for
//! its own entity; sibling fetchers are unaffected. A failed name lookup is
//! not a fetch failure: the records keep fallback labels and the ids are
//! reported as resolution gaps.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::resolver::{distinct_ids, resolve, NameMap, Resolution};
use crate::store::rows::{
    DepositRow, DonationRow, InventoryRow, MovementDetailRow, MovementHeaderRow, ProductNameRow,
    RequestRow, UserRow, DEPOSIT_ID, DONATION_DATE, DONATION_ID, INVENTORY_DEPOSIT, MOVEMENT_DATE,
    MOVEMENT_ID, REQUEST_DATE, USER_ID,
};
use crate::store::{select_rows, Collection, Query, ReportStore};
use crate::types::{
    Deposit, DonationRecord, Entity, FetchError, InventorySnapshot, MovementDetail,
    MovementRecord, MovementStatus, ReportError, ReportFilters, RequestRecord, RequestStatus,
    Result, TransactionType,
};

/// Display labels substituted when a reference cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackLabels {
    pub unknown_user: String,
    pub no_deposit: String,
    pub no_product: String,
    pub no_food_type: String,
}

impl Default for FallbackLabels {
    fn default() -> Self {
        Self {
            unknown_user: "Unknown user".into(),
            no_deposit: "No deposit".into(),
            no_product: "No product".into(),
            no_food_type: "No food type".into(),
        }
    }
}

/// Outcome of one entity fetch
pub type Fetched<T> = std::result::Result<Resolution<T>, FetchError>;

/// User names and roles from one batched lookup
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    pub names: NameMap,
    roles: HashMap<String, String>,
}

impl UserDirectory {
    pub fn from_rows(rows: Vec<UserRow>) -> Self {
        let mut directory = Self::default();
        for row in rows {
            if let Some(role) = row.role.filter(|r| !r.trim().is_empty()) {
                directory.roles.insert(row.id.clone(), role.trim().to_string());
            }
            if let Some(name) = row.name.filter(|n| !n.trim().is_empty()) {
                directory.names.insert(row.id, name);
            }
        }
        directory
    }

    pub fn role(&self, id: &str) -> Option<&str> {
        self.roles.get(id).map(String::as_str)
    }
}

pub struct RecordFetcher {
    store: Arc<dyn ReportStore>,
    labels: FallbackLabels,
}

impl RecordFetcher {
    pub fn new(store: Arc<dyn ReportStore>, labels: FallbackLabels) -> Self {
        Self { store, labels }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub async fn fetch_inventory(&self, filters: &ReportFilters) -> Fetched<InventorySnapshot> {
        self.load_inventory(filters)
            .await
            .map_err(|e| failure(Entity::Inventory, e))
    }

    pub async fn fetch_donations(&self, filters: &ReportFilters) -> Fetched<DonationRecord> {
        self.load_donations(filters)
            .await
            .map_err(|e| failure(Entity::Donations, e))
    }

    pub async fn fetch_requests(&self, filters: &ReportFilters) -> Fetched<RequestRecord> {
        self.load_requests(filters)
            .await
            .map_err(|e| failure(Entity::Requests, e))
    }

    pub async fn fetch_movements(&self, filters: &ReportFilters) -> Fetched<MovementRecord> {
        self.load_movements(filters)
            .await
            .map_err(|e| failure(Entity::Movements, e))
    }

    pub async fn fetch_deposits(&self) -> Fetched<Deposit> {
        self.load_deposits()
            .await
            .map_err(|e| failure(Entity::Deposits, e))
    }

    async fn load_inventory(&self, filters: &ReportFilters) -> Result<Resolution<InventorySnapshot>> {
        let mut query = Query::new();
        if let Some(deposit) = filters.deposit() {
            query = query.eq(INVENTORY_DEPOSIT, deposit);
        }
        let rows: Vec<InventoryRow> =
            select_rows(self.store.as_ref(), Collection::Inventory, &query).await?;

        let deposit_ids = distinct_ids(&rows, |r| [r.deposit_id.as_deref()]);
        let product_ids = distinct_ids(&rows, |r| [r.product_id.as_deref()]);
        let (deposits, products) = tokio::join!(
            self.deposit_names(&deposit_ids),
            self.product_names(&product_ids)
        );

        Ok(build_inventory(rows, &deposits, &products, &self.labels))
    }

    async fn load_donations(&self, filters: &ReportFilters) -> Result<Resolution<DonationRecord>> {
        let query = Query::new().date_range(DONATION_DATE, filters.date_from, filters.date_to);
        let rows: Vec<DonationRow> =
            select_rows(self.store.as_ref(), Collection::Donations, &query).await?;

        let donor_ids = distinct_ids(&rows, |r| [r.donor_id.as_deref()]);
        let users = self.users(&donor_ids).await;

        Ok(build_donations(rows, &users, filters.category(), &self.labels))
    }

    async fn load_requests(&self, filters: &ReportFilters) -> Result<Resolution<RequestRecord>> {
        // Status is matched after the fetch against the canonical table
        let query = Query::new().date_range(REQUEST_DATE, filters.date_from, filters.date_to);
        let rows: Vec<RequestRow> =
            select_rows(self.store.as_ref(), Collection::Requests, &query).await?;

        let requester_ids = distinct_ids(&rows, |r| [r.requester_id.as_deref()]);
        let users = self.users(&requester_ids).await;

        Ok(build_requests(
            rows,
            &users.names,
            filters.status_filter(),
            &self.labels,
        ))
    }

    async fn load_movements(&self, filters: &ReportFilters) -> Result<Resolution<MovementRecord>> {
        let query = Query::new().date_range(MOVEMENT_DATE, filters.date_from, filters.date_to);
        let headers: Vec<MovementHeaderRow> =
            select_rows(self.store.as_ref(), Collection::MovementHeaders, &query).await?;
        if headers.is_empty() {
            return Ok(Resolution {
                records: Vec::new(),
                gaps: Vec::new(),
            });
        }

        let movement_ids = distinct_ids(&headers, |h| [Some(h.id.as_str())]);
        let details: Vec<MovementDetailRow> = select_rows(
            self.store.as_ref(),
            Collection::MovementDetails,
            &Query::new().is_in(MOVEMENT_ID, movement_ids),
        )
        .await?;

        let product_ids = distinct_ids(&details, |d| [d.product_id.as_deref()]);
        let user_ids = distinct_ids(&headers, |h| {
            [h.donor_id.as_deref(), h.requester_id.as_deref()]
        });
        let (products, users) =
            tokio::join!(self.product_names(&product_ids), self.users(&user_ids));

        Ok(build_movements(
            headers,
            details,
            &products,
            &users.names,
            &self.labels,
        ))
    }

    async fn load_deposits(&self) -> Result<Resolution<Deposit>> {
        let rows: Vec<DepositRow> =
            select_rows(self.store.as_ref(), Collection::Deposits, &Query::new()).await?;
        Ok(Resolution {
            records: build_deposits(rows, &self.labels),
            gaps: Vec::new(),
        })
    }

    async fn users(&self, ids: &[String]) -> UserDirectory {
        if ids.is_empty() {
            return UserDirectory::default();
        }
        let query = Query::new().is_in(USER_ID, ids.iter().cloned());
        match select_rows::<UserRow>(self.store.as_ref(), Collection::Users, &query).await {
            Ok(rows) => UserDirectory::from_rows(rows),
            Err(e) => {
                lookup_failed(Collection::Users, &e);
                UserDirectory::default()
            }
        }
    }

    async fn product_names(&self, ids: &[String]) -> NameMap {
        if ids.is_empty() {
            return NameMap::new();
        }
        let query = Query::new().is_in(DONATION_ID, ids.iter().cloned());
        match select_rows::<ProductNameRow>(self.store.as_ref(), Collection::Donations, &query)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|r| r.name.filter(|n| !n.is_empty()).map(|name| (r.id, name)))
                .collect(),
            Err(e) => {
                lookup_failed(Collection::Donations, &e);
                NameMap::new()
            }
        }
    }

    async fn deposit_names(&self, ids: &[String]) -> NameMap {
        if ids.is_empty() {
            return NameMap::new();
        }
        let query = Query::new().is_in(DEPOSIT_ID, ids.iter().cloned());
        match select_rows::<DepositRow>(self.store.as_ref(), Collection::Deposits, &query).await {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|r| r.name.filter(|n| !n.is_empty()).map(|name| (r.id, name)))
                .collect(),
            Err(e) => {
                lookup_failed(Collection::Deposits, &e);
                NameMap::new()
            }
        }
    }
}

fn lookup_failed(collection: Collection, error: &ReportError) {
    log::warn!(
        "{} name lookup failed, using fallback labels: {}",
        collection,
        error
    );
}

fn failure(entity: Entity, error: ReportError) -> FetchError {
    log::warn!("{} fetch failed: {}", entity, error);
    match error {
        ReportError::Fetch(inner) => inner,
        other => FetchError::new(entity, other.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Annotate inventory rows with deposit and product names.
///
/// Negative stock is clamped to zero.
pub fn build_inventory(
    rows: Vec<InventoryRow>,
    deposits: &NameMap,
    products: &NameMap,
    labels: &FallbackLabels,
) -> Resolution<InventorySnapshot> {
    let snapshots: Vec<InventorySnapshot> = rows
        .into_iter()
        .map(|row| InventorySnapshot {
            id: row.id,
            available: row.available.unwrap_or(0.0).max(0.0),
            deposit_id: row.deposit_id,
            deposit_name: String::new(),
            product_id: row.product_id,
            product_name: String::new(),
            updated_at: row.updated_at,
        })
        .collect();

    let by_deposit = resolve(
        snapshots,
        Entity::Inventory,
        |s: &InventorySnapshot| s.deposit_id.as_deref(),
        |s: &mut InventorySnapshot, name| s.deposit_name = name,
        deposits,
        &labels.no_deposit,
    );
    let by_product = resolve(
        by_deposit.records,
        Entity::Inventory,
        |s: &InventorySnapshot| s.product_id.as_deref(),
        |s: &mut InventorySnapshot, name| s.product_name = name,
        products,
        &labels.no_product,
    );

    let mut gaps = by_deposit.gaps;
    gaps.extend(by_product.gaps);
    Resolution {
        records: by_product.records,
        gaps,
    }
}

/// Annotate donations with donor names, keeping only donors of `category`
/// when a category is given. Donors with no known role never match.
pub fn build_donations(
    rows: Vec<DonationRow>,
    users: &UserDirectory,
    category: Option<&str>,
    labels: &FallbackLabels,
) -> Resolution<DonationRecord> {
    let records: Vec<DonationRecord> = rows
        .into_iter()
        .filter(|row| match category {
            None => true,
            Some(category) => row
                .donor_id
                .as_deref()
                .and_then(|id| users.role(id))
                .is_some_and(|role| role.eq_ignore_ascii_case(category)),
        })
        .map(|row| DonationRecord {
            product_id: row.product_id,
            donor_id: row.donor_id,
            product_name: non_empty(row.product_name).unwrap_or_else(|| labels.no_product.clone()),
            description: row.description,
            donated_at: row.donated_at,
            quantity: row.quantity,
            unit: row.unit,
            expires_at: row.expires_at,
            donor_name: String::new(),
        })
        .collect();

    resolve(
        records,
        Entity::Donations,
        |d: &DonationRecord| d.donor_id.as_deref(),
        |d: &mut DonationRecord, name| d.donor_name = name,
        &users.names,
        &labels.unknown_user,
    )
}

/// Annotate requests with requester names, keeping only requests whose
/// canonical status matches `status` when one is given
pub fn build_requests(
    rows: Vec<RequestRow>,
    users: &NameMap,
    status: Option<&str>,
    labels: &FallbackLabels,
) -> Resolution<RequestRecord> {
    let records: Vec<RequestRecord> = rows
        .into_iter()
        .map(|row| RequestRecord {
            id: row.id,
            requester_id: row.requester_id,
            food_type: non_empty(row.food_type).unwrap_or_else(|| labels.no_food_type.clone()),
            quantity: row.quantity,
            comments: row.comments,
            status: RequestStatus::parse(row.status.as_deref().unwrap_or_default()),
            created_at: row.created_at,
            requester_name: String::new(),
        })
        .filter(|record| status.map_or(true, |wanted| record.status.matches(wanted)))
        .collect();

    resolve(
        records,
        Entity::Requests,
        |r: &RequestRecord| r.requester_id.as_deref(),
        |r: &mut RequestRecord, name| r.requester_name = name,
        users,
        &labels.unknown_user,
    )
}

/// Attach details to their headers (store order) and resolve product,
/// donor and requester names
pub fn build_movements(
    headers: Vec<MovementHeaderRow>,
    details: Vec<MovementDetailRow>,
    products: &NameMap,
    users: &NameMap,
    labels: &FallbackLabels,
) -> Resolution<MovementRecord> {
    let lines: Vec<(String, MovementDetail)> = details
        .into_iter()
        .map(|row| {
            let detail = MovementDetail {
                product_id: row.product_id,
                product_name: String::new(),
                quantity: row.quantity,
                transaction_type: TransactionType::parse(
                    row.transaction_type.as_deref().unwrap_or_default(),
                ),
                actor_role: row.actor_role,
            };
            (row.movement_id, detail)
        })
        .collect();
    let lines = resolve(
        lines,
        Entity::Movements,
        |(_, d): &(String, MovementDetail)| d.product_id.as_deref(),
        |(_, d): &mut (String, MovementDetail), name| d.product_name = name,
        products,
        &labels.no_product,
    );

    let mut by_movement: HashMap<String, Vec<MovementDetail>> = HashMap::new();
    for (movement_id, detail) in lines.records {
        by_movement.entry(movement_id).or_default().push(detail);
    }

    let movements: Vec<MovementRecord> = headers
        .into_iter()
        .map(|row| MovementRecord {
            details: by_movement.remove(&row.id).unwrap_or_default(),
            id: row.id,
            moved_at: row.moved_at,
            status: MovementStatus::parse(row.status.as_deref().unwrap_or_default()),
            donor_id: row.donor_id,
            requester_id: row.requester_id,
            donor_name: String::new(),
            requester_name: String::new(),
            notes: row.notes,
        })
        .collect();

    let donors = resolve(
        movements,
        Entity::Movements,
        |m: &MovementRecord| m.donor_id.as_deref(),
        |m: &mut MovementRecord, name| m.donor_name = name,
        users,
        &labels.unknown_user,
    );
    let requesters = resolve(
        donors.records,
        Entity::Movements,
        |m: &MovementRecord| m.requester_id.as_deref(),
        |m: &mut MovementRecord, name| m.requester_name = name,
        users,
        &labels.unknown_user,
    );

    let mut gaps = lines.gaps;
    gaps.extend(donors.gaps);
    for gap in requesters.gaps {
        if !gaps.contains(&gap) {
            gaps.push(gap);
        }
    }
    Resolution {
        records: requesters.records,
        gaps,
    }
}

pub fn build_deposits(rows: Vec<DepositRow>, labels: &FallbackLabels) -> Vec<Deposit> {
    rows.into_iter()
        .map(|row| Deposit {
            name: non_empty(row.name).unwrap_or_else(|| labels.no_deposit.clone()),
            id: row.id,
            description: row.description,
        })
        .collect()
}
