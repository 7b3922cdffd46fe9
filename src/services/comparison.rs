//! Donation vs request comparison by month
//!
//! Donations and requests are aggregated into period-keyed maps with the
//! same period derivation, then unioned: a month present on only one side
//! still produces a row, with the other side at zero.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::types::{
    AggregationInconsistency, ComparisonRow, ComparisonSummary, DonationRecord, RequestRecord,
    YearMonth,
};

/// Requested and fulfilled quantity for one period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RequestVolume {
    pub requested: f64,
    pub fulfilled: f64,
}

/// Period key shared by both sides of the comparison
pub fn period_of(ts: DateTime<Utc>) -> YearMonth {
    YearMonth::of(ts.date_naive())
}

pub struct ComparisonSynthesizer;

impl ComparisonSynthesizer {
    /// Donated quantity by period. Undated donations are excluded.
    pub fn donations_by_period(donations: &[DonationRecord]) -> HashMap<YearMonth, f64> {
        let mut periods: HashMap<YearMonth, f64> = HashMap::new();
        for donation in donations {
            if let Some(ts) = donation.donated_at {
                *periods.entry(period_of(ts)).or_default() += donation.quantity_or_zero();
            }
        }
        periods
    }

    /// Requested and fulfilled quantity by period. Undated requests are excluded.
    pub fn requests_by_period(requests: &[RequestRecord]) -> HashMap<YearMonth, RequestVolume> {
        let mut periods: HashMap<YearMonth, RequestVolume> = HashMap::new();
        for request in requests {
            let Some(ts) = request.created_at else {
                continue;
            };
            let volume = periods.entry(period_of(ts)).or_default();
            let quantity = request.quantity_or_zero();
            volume.requested += quantity;
            if request.status.is_fulfilled() {
                volume.fulfilled += quantity;
            }
        }
        periods
    }

    /// Union both period maps into chronologically ordered rows
    pub fn combine(
        donations: &HashMap<YearMonth, f64>,
        requests: &HashMap<YearMonth, RequestVolume>,
    ) -> Vec<ComparisonRow> {
        let periods: HashSet<YearMonth> = donations.keys().chain(requests.keys()).copied().collect();

        let mut rows: Vec<ComparisonRow> = periods
            .into_iter()
            .map(|period| {
                let mut row = ComparisonRow::empty(period);
                row.donations = donations.get(&period).copied().unwrap_or(0.0);
                if let Some(volume) = requests.get(&period) {
                    row.requests = volume.requested;
                    row.fulfilled = volume.fulfilled;
                }
                row
            })
            .collect();
        rows.sort_by_key(|row| row.period);

        for issue in Self::inconsistencies(&rows) {
            log::warn!("aggregation inconsistency: {}", issue);
        }
        rows
    }

    /// Aggregate both record sets and combine them
    pub fn synthesize(
        donations: &[DonationRecord],
        requests: &[RequestRecord],
    ) -> Vec<ComparisonRow> {
        Self::combine(
            &Self::donations_by_period(donations),
            &Self::requests_by_period(requests),
        )
    }

    /// Rows whose pending quantity would be negative
    pub fn inconsistencies(rows: &[ComparisonRow]) -> Vec<AggregationInconsistency> {
        rows.iter()
            .filter(|row| row.pending() < 0.0)
            .map(|row| AggregationInconsistency {
                period: row.period.key(),
                requested: row.requests,
                fulfilled: row.fulfilled,
            })
            .collect()
    }

    pub fn summary(rows: &[ComparisonRow]) -> ComparisonSummary {
        if rows.is_empty() {
            return ComparisonSummary::default();
        }

        let mut summary = ComparisonSummary::default();
        let mut efficiency_total: u64 = 0;
        for row in rows {
            summary.donations += row.donations;
            summary.requests += row.requests;
            summary.fulfilled += row.fulfilled;
            efficiency_total += u64::from(row.efficiency());
        }
        summary.mean_efficiency =
            (efficiency_total as f64 / rows.len() as f64).round() as u32;
        summary
    }
}
