//! `donreport` command line

mod output;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::{ReportConfig, StoreConfig};
use crate::services::{
    ExportFormat, Exporter, RecordFetcher, ReportSession, ReportSnapshot, ReportType,
};
use crate::types::ReportFilters;

/// Donation, request, inventory and movement reports
#[derive(Parser, Debug)]
#[command(name = "donreport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    filters: FilterArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Headline figures and every aggregate (default)
    Summary,

    /// Stock by deposit
    Inventory,

    /// Donations by day and top products
    Donations,

    /// Requests by status and top food types
    Requests,

    /// Movement timeline, statuses and transaction types
    Movements,

    /// Donations vs requests by month
    Comparison,

    /// Write one report view to a file
    Export {
        #[arg(value_enum)]
        report: ReportType,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Output directory (defaults to the configured export dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Config file (defaults to ~/.donreport/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read `<table>.json` files from this directory (takes precedence over --url)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// PostgREST base URL
    #[arg(long, global = true, env = "DONREPORT_URL")]
    url: Option<String>,

    /// API key sent with REST requests
    #[arg(long, global = true, env = "DONREPORT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    to: Option<NaiveDate>,

    /// Deposit id
    #[arg(long, global = true)]
    deposit: Option<String>,

    /// Donor category (user role)
    #[arg(long, global = true)]
    category: Option<String>,

    /// Request status
    #[arg(long, global = true)]
    status: Option<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

impl FilterArgs {
    /// `--to` covers the whole day
    fn to_filters(&self) -> ReportFilters {
        let from = self
            .from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        let to = self
            .to
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|dt| dt.and_utc());

        let mut filters = ReportFilters::new().with_date_range(from, to);
        filters.deposit_id = self.deposit.clone();
        filters.user_category = self.category.clone();
        filters.status = self.status.clone();
        filters
    }
}

impl SourceArgs {
    /// Config file values, overridden by command-line and environment flags
    fn resolve(&self) -> anyhow::Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::load_from(path)?,
            None => ReportConfig::load()?,
        };

        if let Some(dir) = &self.data_dir {
            config.store = StoreConfig::Json { dir: dir.clone() };
        } else if let Some(url) = &self.url {
            let timeout_secs = match &config.store {
                StoreConfig::Rest { timeout_secs, .. } => *timeout_secs,
                StoreConfig::Json { .. } => crate::store::DEFAULT_TIMEOUT_SECS,
            };
            config.store = StoreConfig::Rest {
                url: url.clone(),
                api_key: self.api_key.clone(),
                timeout_secs,
            };
        } else if let (Some(key), StoreConfig::Rest { api_key, .. }) =
            (&self.api_key, &mut config.store)
        {
            *api_key = Some(key.clone());
        }
        Ok(config)
    }
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(self) -> anyhow::Result<()> {
        let config = self.source.resolve()?;
        let store = config.build_store().context("failed to open data store")?;
        log::debug!("using store {}", store.name());

        let mut session = ReportSession::new(RecordFetcher::new(store, config.labels.clone()));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let snapshot = runtime.block_on(session.set_filters(self.filters.to_filters()));

        for failure in &snapshot.failures {
            eprintln!("[donreport] Warning: {}", failure);
        }
        if !snapshot.gaps.is_empty() {
            log::info!("{} unresolved reference(s)", snapshot.gaps.len());
        }
        if snapshot.all_failed() {
            anyhow::bail!("no report data could be loaded");
        }

        match self.command.unwrap_or(Commands::Summary) {
            Commands::Export {
                report,
                format,
                output,
            } => {
                let dir = match output {
                    Some(dir) => dir,
                    None => config.export_dir()?,
                };
                let path = Exporter::new(dir).export(report, format, &snapshot)?;
                println!("{}", path.display());
                Ok(())
            }
            command => print_view(&command, &snapshot, self.json),
        }
    }
}

fn print_view(command: &Commands, snapshot: &ReportSnapshot, json: bool) -> anyhow::Result<()> {
    let text = match (command, json) {
        (Commands::Inventory, true) => output::inventory_json(snapshot)?,
        (Commands::Inventory, false) => output::inventory_text(snapshot),
        (Commands::Donations, true) => output::donations_json(snapshot)?,
        (Commands::Donations, false) => output::donations_text(snapshot),
        (Commands::Requests, true) => output::requests_json(snapshot)?,
        (Commands::Requests, false) => output::requests_text(snapshot),
        (Commands::Movements, true) => output::movements_json(snapshot)?,
        (Commands::Movements, false) => output::movements_text(snapshot),
        (Commands::Comparison, true) => output::comparison_json(snapshot)?,
        (Commands::Comparison, false) => output::comparison_text(snapshot),
        (_, true) => output::summary_json(snapshot)?,
        (_, false) => output::summary_text(snapshot),
    };
    println!("{}", text);
    Ok(())
}
