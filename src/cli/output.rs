//! Text and JSON rendering of report views

use std::fmt::Write;

use serde_json::json;

use crate::services::{Aggregator, ReportSnapshot};
use crate::types::{KeyedCount, KeyedQuantity};

fn pretty(value: serde_json::Value) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&value)?)
}

fn keyed_table(out: &mut String, title: &str, rows: &[KeyedQuantity]) {
    let _ = writeln!(out, "{}", title);
    if rows.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<28} {:>12.2} {:>6}",
            row.key, row.quantity, row.count
        );
    }
}

fn count_table(out: &mut String, title: &str, rows: &[KeyedCount]) {
    let _ = writeln!(out, "{}", title);
    if rows.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    for row in rows {
        let _ = writeln!(out, "  {:<28} {:>6}", row.key, row.count);
    }
}

pub fn summary_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "status": snapshot.status,
        "filters": snapshot.filters,
        "overview": snapshot.overview(),
        "comparison": snapshot.comparison_summary(),
        "failures": snapshot.failures,
    }))
}

pub fn summary_text(snapshot: &ReportSnapshot) -> String {
    let overview = snapshot.overview();
    let comparison = snapshot.comparison_summary();

    let mut out = String::new();
    let _ = writeln!(out, "Total inventory:    {:.2}", overview.total_inventory);
    let _ = writeln!(out, "Donations:          {}", overview.donation_count);
    let _ = writeln!(out, "Pending requests:   {}", overview.pending_requests);
    let _ = writeln!(out, "Active users:       {}", overview.active_users);
    let _ = writeln!(out, "Mean efficiency:    {}%", comparison.mean_efficiency);
    let _ = writeln!(out);
    keyed_table(
        &mut out,
        "Stock by deposit",
        &Aggregator::inventory_by_deposit(&snapshot.inventory),
    );
    keyed_table(
        &mut out,
        "Requests by status",
        &Aggregator::requests_by_status(&snapshot.requests),
    );
    out.trim_end().to_string()
}

pub fn inventory_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "by_deposit": Aggregator::inventory_by_deposit(&snapshot.inventory),
        "items": snapshot.inventory,
    }))
}

pub fn inventory_text(snapshot: &ReportSnapshot) -> String {
    let mut out = String::new();
    keyed_table(
        &mut out,
        "Stock by deposit",
        &Aggregator::inventory_by_deposit(&snapshot.inventory),
    );
    out.trim_end().to_string()
}

pub fn donations_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "by_day": Aggregator::donations_by_day(&snapshot.donations),
        "top_products": Aggregator::donations_by_product(&snapshot.donations),
    }))
}

pub fn donations_text(snapshot: &ReportSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Donations by day");
    for day in Aggregator::donations_by_day(&snapshot.donations) {
        let _ = writeln!(out, "  {}  {:>12.2} {:>6}", day.date, day.quantity, day.count);
    }
    keyed_table(
        &mut out,
        "Top products",
        &Aggregator::donations_by_product(&snapshot.donations),
    );
    out.trim_end().to_string()
}

pub fn requests_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "by_status": Aggregator::requests_by_status(&snapshot.requests),
        "top_food_types": Aggregator::requests_by_food_type(&snapshot.requests),
    }))
}

pub fn requests_text(snapshot: &ReportSnapshot) -> String {
    let mut out = String::new();
    keyed_table(
        &mut out,
        "Requests by status",
        &Aggregator::requests_by_status(&snapshot.requests),
    );
    keyed_table(
        &mut out,
        "Top food types",
        &Aggregator::requests_by_food_type(&snapshot.requests),
    );
    out.trim_end().to_string()
}

pub fn movements_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "timeline": Aggregator::movement_timeline(&snapshot.movements),
        "by_status": Aggregator::movements_by_status(&snapshot.movements),
        "by_transaction_type": Aggregator::movements_by_transaction_type(&snapshot.movements),
    }))
}

pub fn movements_text(snapshot: &ReportSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Movements by day (total / pending / completed)");
    for day in Aggregator::movement_timeline(&snapshot.movements) {
        let _ = writeln!(
            out,
            "  {}  {:>6} {:>6} {:>6}",
            day.date, day.total, day.pending, day.completed
        );
    }
    count_table(
        &mut out,
        "Movements by status",
        &Aggregator::movements_by_status(&snapshot.movements),
    );
    keyed_table(
        &mut out,
        "Quantity by transaction type",
        &Aggregator::movements_by_transaction_type(&snapshot.movements),
    );
    out.trim_end().to_string()
}

pub fn comparison_json(snapshot: &ReportSnapshot) -> anyhow::Result<String> {
    pretty(json!({
        "rows": snapshot.comparison,
        "summary": snapshot.comparison_summary(),
    }))
}

pub fn comparison_text(snapshot: &ReportSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>12} {:>12} {:>12} {:>12} {:>5}",
        "Period", "Donated", "Requested", "Fulfilled", "Pending", "Eff%"
    );
    for row in &snapshot.comparison {
        let _ = writeln!(
            out,
            "{:<10} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>5}",
            row.label,
            row.donations,
            row.requests,
            row.fulfilled,
            row.pending(),
            row.efficiency()
        );
    }
    let summary = snapshot.comparison_summary();
    let _ = writeln!(
        out,
        "{:<10} {:>12.2} {:>12.2} {:>12.2} {:>12} {:>5}",
        "Total", summary.donations, summary.requests, summary.fulfilled, "", summary.mean_efficiency
    );
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComparisonRow, YearMonth};

    fn make_snapshot() -> ReportSnapshot {
        let mut row = ComparisonRow::empty(YearMonth {
            year: 2024,
            month: 2,
        });
        row.donations = 3.0;
        row.requests = 4.0;
        row.fulfilled = 1.0;

        let mut snapshot = ReportSnapshot::default();
        snapshot.comparison = vec![row];
        snapshot
    }

    #[test]
    fn test_comparison_text() {
        let text = comparison_text(&make_snapshot());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("feb 2024"));
        assert!(lines[1].ends_with("25"));
    }

    #[test]
    fn test_comparison_json() {
        let text = comparison_json(&make_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rows"][0]["period"], "2024-02");
        assert_eq!(value["summary"]["mean_efficiency"], 25);
    }

    #[test]
    fn test_empty_tables() {
        let text = requests_text(&ReportSnapshot::default());
        assert!(text.contains("(none)"));
    }
}
