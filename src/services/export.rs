//! Report export to JSON or CSV files

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::Serialize;

use crate::services::session::ReportSnapshot;
use crate::types::{ReportError, Result};

/// Exportable report views
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportType {
    Inventory,
    Donations,
    Requests,
    Movements,
    Comparison,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Inventory => "inventory",
            ReportType::Donations => "donations",
            ReportType::Requests => "requests",
            ReportType::Movements => "movements",
            ReportType::Comparison => "comparison",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Serialize)]
struct InventoryLine<'a> {
    id: &'a str,
    deposit: &'a str,
    product: &'a str,
    available: f64,
    stock_level: crate::types::StockLevel,
    updated_at: Option<String>,
}

#[derive(Serialize)]
struct DonationLine<'a> {
    product_id: &'a str,
    product: &'a str,
    donor: &'a str,
    quantity: f64,
    unit: Option<&'a str>,
    donated_at: Option<String>,
    expires_at: Option<String>,
    expiry_status: crate::types::ExpiryStatus,
}

#[derive(Serialize)]
struct RequestLine<'a> {
    id: &'a str,
    requester: &'a str,
    food_type: &'a str,
    quantity: f64,
    status: &'a str,
    created_at: Option<String>,
    comments: Option<&'a str>,
}

#[derive(Serialize)]
struct MovementLine<'a> {
    movement_id: &'a str,
    moved_at: Option<String>,
    status: &'a str,
    donor: &'a str,
    requester: &'a str,
    product: Option<&'a str>,
    quantity: Option<f64>,
    transaction_type: Option<&'a str>,
    actor_role: Option<&'a str>,
}

#[derive(Serialize)]
struct ComparisonLine<'a> {
    period: String,
    label: &'a str,
    donations: f64,
    requests: f64,
    fulfilled: f64,
    pending: f64,
    efficiency: u32,
}

fn timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

/// Writes report files into one directory
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `report` from `snapshot` to `<dir>/<type>_<timestamp>.<ext>`
    pub fn export(
        &self,
        report: ReportType,
        format: ExportFormat,
        snapshot: &ReportSnapshot,
    ) -> Result<PathBuf> {
        let now = Utc::now();
        let content = Self::render(report, format, snapshot, now.date_naive())?;

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(report, format, now));
        write_atomic(&path, &content)?;

        log::info!("exported {} report to {}", report.as_str(), path.display());
        Ok(path)
    }

    pub fn file_name(report: ReportType, format: ExportFormat, at: DateTime<Utc>) -> String {
        format!(
            "{}_{}.{}",
            report.as_str(),
            at.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    /// Serialize one report view. `today` anchors expiry classification.
    pub fn render(
        report: ReportType,
        format: ExportFormat,
        snapshot: &ReportSnapshot,
        today: NaiveDate,
    ) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Json => Self::render_json(report, snapshot),
            ExportFormat::Csv => Self::render_csv(report, snapshot, today),
        }
    }

    fn render_json(report: ReportType, snapshot: &ReportSnapshot) -> Result<Vec<u8>> {
        let result = match report {
            ReportType::Inventory => serde_json::to_vec_pretty(&snapshot.inventory),
            ReportType::Donations => serde_json::to_vec_pretty(&snapshot.donations),
            ReportType::Requests => serde_json::to_vec_pretty(&snapshot.requests),
            ReportType::Movements => serde_json::to_vec_pretty(&snapshot.movements),
            ReportType::Comparison => serde_json::to_vec_pretty(&snapshot.comparison),
        };
        result.map_err(|e| ReportError::Export(format!("serialization failed: {}", e)))
    }

    fn render_csv(report: ReportType, snapshot: &ReportSnapshot, today: NaiveDate) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        match report {
            ReportType::Inventory => {
                for item in &snapshot.inventory {
                    write_line(
                        &mut writer,
                        &InventoryLine {
                            id: &item.id,
                            deposit: &item.deposit_name,
                            product: &item.product_name,
                            available: item.available,
                            stock_level: item.stock_level(),
                            updated_at: timestamp(item.updated_at),
                        },
                    )?;
                }
            }
            ReportType::Donations => {
                for donation in &snapshot.donations {
                    write_line(
                        &mut writer,
                        &DonationLine {
                            product_id: &donation.product_id,
                            product: &donation.product_name,
                            donor: &donation.donor_name,
                            quantity: donation.quantity_or_zero(),
                            unit: donation.unit.as_deref(),
                            donated_at: timestamp(donation.donated_at),
                            expires_at: timestamp(donation.expires_at),
                            expiry_status: donation.expiry_status(today),
                        },
                    )?;
                }
            }
            ReportType::Requests => {
                for request in &snapshot.requests {
                    write_line(
                        &mut writer,
                        &RequestLine {
                            id: &request.id,
                            requester: &request.requester_name,
                            food_type: &request.food_type,
                            quantity: request.quantity_or_zero(),
                            status: request.status.key(),
                            created_at: timestamp(request.created_at),
                            comments: request.comments.as_deref(),
                        },
                    )?;
                }
            }
            ReportType::Movements => {
                for movement in &snapshot.movements {
                    let header = MovementLine {
                        movement_id: &movement.id,
                        moved_at: timestamp(movement.moved_at),
                        status: movement.status.key(),
                        donor: &movement.donor_name,
                        requester: &movement.requester_name,
                        product: None,
                        quantity: None,
                        transaction_type: None,
                        actor_role: None,
                    };
                    if movement.details.is_empty() {
                        write_line(&mut writer, &header)?;
                        continue;
                    }
                    for detail in &movement.details {
                        write_line(
                            &mut writer,
                            &MovementLine {
                                moved_at: header.moved_at.clone(),
                                product: Some(&detail.product_name),
                                quantity: Some(detail.quantity_or_zero()),
                                transaction_type: Some(detail.transaction_type.key()),
                                actor_role: detail.actor_role.as_deref(),
                                ..header
                            },
                        )?;
                    }
                }
            }
            ReportType::Comparison => {
                for row in &snapshot.comparison {
                    write_line(
                        &mut writer,
                        &ComparisonLine {
                            period: row.period.key(),
                            label: &row.label,
                            donations: row.donations,
                            requests: row.requests,
                            fulfilled: row.fulfilled,
                            pending: row.pending(),
                            efficiency: row.efficiency(),
                        },
                    )?;
                }
            }
        }

        writer
            .into_inner()
            .map_err(|e| ReportError::Export(format!("csv flush failed: {}", e)))
    }
}

fn write_line<S: Serialize>(writer: &mut csv::Writer<Vec<u8>>, line: &S) -> Result<()> {
    writer
        .serialize(line)
        .map_err(|e| ReportError::Export(format!("csv write failed: {}", e)))
}

/// Write to a temp file, then rename over `path` while holding an exclusive lock
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)
            .map_err(|e| ReportError::Export(format!("failed to create temp file: {}", e)))?;
        file.write_all(content)
            .map_err(|e| ReportError::Export(format!("failed to write temp file: {}", e)))?;
        file.sync_all()
            .map_err(|e| ReportError::Export(format!("failed to sync temp file: {}", e)))?;
    }

    let target = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    target
        .lock_exclusive()
        .map_err(|e| ReportError::Export(format!("failed to acquire write lock: {}", e)))?;

    fs::rename(&temp_path, path)
        .map_err(|e| ReportError::Export(format!("failed to rename temp file: {}", e)))?;

    let _ = target.unlock();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ComparisonRow, DonationRecord, MovementDetail, MovementRecord, MovementStatus,
        TransactionType, YearMonth,
    };
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn make_movement(id: &str, details: Vec<MovementDetail>) -> MovementRecord {
        MovementRecord {
            id: id.into(),
            moved_at: Some(Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()),
            status: MovementStatus::Completed,
            donor_id: Some("u1".into()),
            requester_id: None,
            donor_name: "Ana".into(),
            requester_name: "Unknown user".into(),
            notes: None,
            details,
        }
    }

    fn make_detail(product: &str, qty: f64) -> MovementDetail {
        MovementDetail {
            product_id: Some("p1".into()),
            product_name: product.into(),
            quantity: Some(qty),
            transaction_type: TransactionType::Ingress,
            actor_role: Some("donante".into()),
        }
    }

    fn make_snapshot() -> ReportSnapshot {
        let mut row = ComparisonRow::empty(YearMonth {
            year: 2024,
            month: 1,
        });
        row.donations = 10.0;
        row.requests = 8.0;
        row.fulfilled = 4.0;

        let mut snapshot = ReportSnapshot::default();
        snapshot.movements = vec![
            make_movement("m1", vec![make_detail("Arroz", 5.0), make_detail("Leche", 2.0)]),
            make_movement("m2", Vec::new()),
        ];
        snapshot.donations = vec![DonationRecord {
            product_id: "p1".into(),
            donor_id: None,
            product_name: "Arroz".into(),
            description: None,
            donated_at: None,
            quantity: None,
            unit: Some("kg".into()),
            expires_at: Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
            donor_name: "Unknown user".into(),
        }];
        snapshot.comparison = vec![row];
        snapshot
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn render_csv(report: ReportType) -> String {
        let bytes = Exporter::render(report, ExportFormat::Csv, &make_snapshot(), today()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_comparison_csv() {
        let csv = render_csv(ReportType::Comparison);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "period,label,donations,requests,fulfilled,pending,efficiency"
        );
        assert_eq!(lines[1], "2024-01,ene 2024,10.0,8.0,4.0,4.0,50");
    }

    #[test]
    fn test_movements_csv_one_row_per_detail() {
        let csv = render_csv(ReportType::Movements);
        let lines: Vec<&str> = csv.lines().collect();

        // header + 2 detail rows for m1 + 1 bare row for m2
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("m1,"));
        assert!(lines[1].contains("Arroz,5.0,ingress,donante"));
        assert!(lines[2].contains("Leche,2.0"));
        assert!(lines[3].starts_with("m2,"));
        assert!(lines[3].ends_with(",,,,"));
    }

    #[test]
    fn test_donations_csv_expiry_and_missing_quantity() {
        let csv = render_csv(ReportType::Donations);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",0.0,kg,"));
        assert!(lines[1].ends_with("expires_soon"));
    }

    #[test]
    fn test_empty_view_renders_empty_csv() {
        let csv = render_csv(ReportType::Inventory);
        assert!(csv.is_empty());
    }

    #[test]
    fn test_json_render() {
        let bytes =
            Exporter::render(ReportType::Comparison, ExportFormat::Json, &make_snapshot(), today())
                .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["period"], "2024-01");
        assert_eq!(value[0]["label"], "ene 2024");
    }

    #[test]
    fn test_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            Exporter::file_name(ReportType::Movements, ExportFormat::Csv, at),
            "movements_20240309_140507.csv"
        );
    }

    #[test]
    fn test_export_writes_file_atomically() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("exports"));

        let path = exporter
            .export(ReportType::Comparison, ExportFormat::Json, &make_snapshot())
            .unwrap();

        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("exports")));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("2024-01"));
        assert!(!path.with_extension("tmp").exists());
    }
}
