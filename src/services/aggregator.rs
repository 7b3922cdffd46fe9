//! Aggregator service for computing report aggregates

use crate::types::{
    DailyQuantity, DonationRecord, InventorySnapshot, KeyedCount, KeyedQuantity, MovementDay,
    MovementRecord, MovementStatus, Overview, RequestRecord,
};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Size of the product ranking
pub const TOP_PRODUCTS: usize = 10;
/// Size of the food-type ranking
pub const TOP_FOOD_TYPES: usize = 8;
/// Number of most recent days kept in the movement timeline
pub const MOVEMENT_TIMELINE_DAYS: usize = 30;

/// Group `records` by a derived key and fold each group into an accumulator.
///
/// Groups come out in first-seen key order. Records whose key is `None`
/// are left out.
pub fn group_by<T, K, A, KF, SF, FF>(records: &[T], key_fn: KF, seed: SF, fold: FF) -> Vec<A>
where
    K: Eq + Hash,
    KF: Fn(&T) -> Option<K>,
    SF: Fn(&K) -> A,
    FF: Fn(&mut A, &T),
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<A> = Vec::new();

    for record in records {
        let Some(key) = key_fn(record) else {
            continue;
        };
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(seed(&key));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        fold(&mut groups[slot], record);
    }

    groups
}

/// Sort descending by `metric` and keep the first `n` rows.
/// The sort is stable, so ties keep their incoming order.
pub fn top_n<T, F>(mut rows: Vec<T>, n: usize, metric: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(Ordering::Equal));
    rows.truncate(n);
    rows
}

/// Keep the last `n` rows of an ascending series (older rows are dropped)
pub fn most_recent<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    if rows.len() > n {
        rows.drain(..rows.len() - n);
    }
    rows
}

/// Aggregator for computing report aggregates
pub struct Aggregator;

impl Aggregator {
    /// Donations by calendar day (sorted by date ascending).
    /// Undated donations are excluded.
    pub fn donations_by_day(donations: &[DonationRecord]) -> Vec<DailyQuantity> {
        let mut result = group_by(
            donations,
            |d| d.donated_at.map(|ts| ts.date_naive()),
            |date: &NaiveDate| DailyQuantity {
                date: *date,
                quantity: 0.0,
                count: 0,
            },
            |acc, d| {
                acc.quantity += d.quantity_or_zero();
                acc.count = acc.count.saturating_add(1);
            },
        );
        result.sort_by_key(|row| row.date);
        result
    }

    /// Donated quantity by product name, top [`TOP_PRODUCTS`] by quantity
    pub fn donations_by_product(donations: &[DonationRecord]) -> Vec<KeyedQuantity> {
        let grouped = group_by(
            donations,
            |d| Some(d.product_name.clone()),
            |name: &String| KeyedQuantity::new(name.clone()),
            |acc, d| acc.add(d.quantity_or_zero()),
        );
        top_n(grouped, TOP_PRODUCTS, |row| row.quantity)
    }

    /// Request count and quantity by canonical status (first-seen order)
    pub fn requests_by_status(requests: &[RequestRecord]) -> Vec<KeyedQuantity> {
        group_by(
            requests,
            |r| Some(r.status.key().to_string()),
            |key: &String| KeyedQuantity::new(key.clone()),
            |acc, r| acc.add(r.quantity_or_zero()),
        )
    }

    /// Requests by food type, top [`TOP_FOOD_TYPES`] by request count
    pub fn requests_by_food_type(requests: &[RequestRecord]) -> Vec<KeyedQuantity> {
        let grouped = group_by(
            requests,
            |r| Some(r.food_type.clone()),
            |key: &String| KeyedQuantity::new(key.clone()),
            |acc, r| acc.add(r.quantity_or_zero()),
        );
        top_n(grouped, TOP_FOOD_TYPES, |row| row.count as f64)
    }

    /// Available stock by deposit name (first-seen order)
    pub fn inventory_by_deposit(inventory: &[InventorySnapshot]) -> Vec<KeyedQuantity> {
        group_by(
            inventory,
            |i| Some(i.deposit_name.clone()),
            |key: &String| KeyedQuantity::new(key.clone()),
            |acc, i| acc.add(i.available),
        )
    }

    /// Movement count by status (first-seen order)
    pub fn movements_by_status(movements: &[MovementRecord]) -> Vec<KeyedCount> {
        group_by(
            movements,
            |m| Some(m.status.key().to_string()),
            |key: &String| KeyedCount {
                key: key.clone(),
                count: 0,
            },
            |acc, _| acc.count = acc.count.saturating_add(1),
        )
    }

    /// Daily movement counts, ascending, limited to the most recent
    /// [`MOVEMENT_TIMELINE_DAYS`] days that have movements
    pub fn movement_timeline(movements: &[MovementRecord]) -> Vec<MovementDay> {
        let mut days = group_by(
            movements,
            |m| m.moved_at.map(|ts| ts.date_naive()),
            |date: &NaiveDate| MovementDay {
                date: *date,
                total: 0,
                pending: 0,
                completed: 0,
            },
            |acc, m| {
                acc.total = acc.total.saturating_add(1);
                match m.status {
                    MovementStatus::Pending => acc.pending = acc.pending.saturating_add(1),
                    MovementStatus::Completed => {
                        acc.completed = acc.completed.saturating_add(1)
                    }
                    _ => {}
                }
            },
        );
        days.sort_by_key(|d| d.date);
        most_recent(days, MOVEMENT_TIMELINE_DAYS)
    }

    /// Detail quantity and line count by transaction type, over the
    /// flattened details of all movements (first-seen order)
    pub fn movements_by_transaction_type(movements: &[MovementRecord]) -> Vec<KeyedQuantity> {
        let details: Vec<_> = movements.iter().flat_map(|m| m.details.iter()).collect();
        group_by(
            &details,
            |d| Some(d.transaction_type.key().to_string()),
            |key: &String| KeyedQuantity::new(key.clone()),
            |acc, d| acc.add(d.quantity_or_zero()),
        )
    }

    /// Headline figures across the loaded collections
    pub fn overview(
        inventory: &[InventorySnapshot],
        donations: &[DonationRecord],
        requests: &[RequestRecord],
    ) -> Overview {
        let total_inventory: f64 = inventory.iter().map(|i| i.available).sum();
        let pending_requests = requests.iter().filter(|r| r.status.is_pending()).count() as u64;

        let mut users: HashSet<&str> = HashSet::new();
        users.extend(donations.iter().filter_map(|d| d.donor_id.as_deref()));
        users.extend(requests.iter().filter_map(|r| r.requester_id.as_deref()));

        Overview {
            total_inventory,
            donation_count: donations.len() as u64,
            pending_requests,
            active_users: users.len() as u64,
        }
    }
}
