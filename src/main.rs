// Entry point and high-level CLI flow.
//
// One invocation is one analysis session:
// - load (or reuse from the session cache) the meter dataset and, when
//   given, the sales dataset;
// - apply the date/region/usage-type selection;
// - print a preview of every view and export each one as CSV, plus a JSON
//   summary.
use anyhow::{Context, Result};
use clap::Parser;
use gas_induction::cache::{DatasetCache, HttpFetcher, Source};
use gas_induction::config::AppConfig;
use gas_induction::filter::{self, Selection};
use gas_induction::loader::{self, MeterDataset};
use gas_induction::loss::{self, LossParams};
use gas_induction::period::YearMonth;
use gas_induction::sales::{self, SalesDataset};
use gas_induction::types::DerivedRecord;
use gas_induction::{observability, output, reports, util};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "gas-induction",
    version,
    about = "Estimate gas-range to induction conversion and the resulting sales loss"
)]
struct Args {
    /// Meter dataset: CSV/Excel path or http(s) URL
    #[arg(long, value_name = "SOURCE")]
    meters: String,

    /// Sales dataset (thousand m3 per usage category): path or URL
    #[arg(long, value_name = "SOURCE")]
    sales: Option<String>,

    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// First month to include (YYYY-MM)
    #[arg(long, value_name = "YYYY-MM")]
    from: Option<YearMonth>,

    /// Last month to include (YYYY-MM)
    #[arg(long, value_name = "YYYY-MM")]
    to: Option<YearMonth>,

    /// Region to include; repeat for several. Default: all
    #[arg(long = "region", value_name = "NAME")]
    regions: Vec<String>,

    /// Usage type to include; repeat for several. Default: all
    #[arg(long = "usage-type", value_name = "NAME")]
    usage_types: Vec<String>,

    /// Average monthly usage per household, m3
    #[arg(long, value_name = "M3")]
    usage: Option<f64>,

    /// Unit price per m3
    #[arg(long, value_name = "PRICE")]
    price: Option<f64>,

    /// Output directory for CSV/JSON exports
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

/// Per-session state: configuration plus the dataset caches. Passed by
/// reference to every handler.
struct Session {
    config: AppConfig,
    fetcher: HttpFetcher,
    meters: DatasetCache<MeterDataset>,
    sales: DatasetCache<SalesDataset>,
}

impl Session {
    fn new(config: AppConfig) -> Self {
        let ttl = config.cache.ttl();
        Self {
            config,
            fetcher: HttpFetcher::new(),
            meters: DatasetCache::new(ttl),
            sales: DatasetCache::new(ttl),
        }
    }
}

fn selection_from(args: &Args) -> Selection {
    let set = |v: &[String]| (!v.is_empty()).then(|| v.iter().cloned().collect::<BTreeSet<_>>());
    Selection {
        from: args.from,
        to: args.to,
        regions: set(args.regions.as_slice()),
        usage_types: set(args.usage_types.as_slice()),
    }
}

/// Load and clean the meter dataset, printing diagnostics.
fn handle_load(session: &mut Session, source: &str) -> Result<Arc<MeterDataset>> {
    let source = Source::parse(source);
    let data = session
        .meters
        .load_source(&source, &session.fetcher, loader::load_bytes)
        .with_context(|| format!("failed to load meter dataset {source:?}"))?;

    let report = &data.report;
    println!(
        "Processing dataset... ({} rows read, {} kept)",
        util::format_int(report.total_rows),
        util::format_int(report.kept_rows)
    );
    if report.dropped_rows > 0 {
        println!(
            "Note: {} rows without a valid YYYYMM period were skipped.",
            util::format_int(report.dropped_rows)
        );
    }
    if report.negative_estimates > 0 {
        println!(
            "Warning: {} rows report more gas ranges than billed meters; their estimates are negative.",
            util::format_int(report.negative_estimates)
        );
    }
    for w in &report.warnings {
        println!("Warning: {}", w);
    }
    println!();
    Ok(data)
}

fn handle_load_sales(session: &mut Session, source: &str) -> Result<Arc<SalesDataset>> {
    let source = Source::parse(source);
    let sheet = session.config.sales.sheet.clone();
    let cats = session.config.sales.categories();
    let data = session
        .sales
        .load_source(&source, &session.fetcher, |bytes| {
            sales::load_sales_bytes(bytes, &sheet, &cats)
        })
        .with_context(|| format!("failed to load sales dataset {source:?}"))?;

    println!(
        "Sales dataset: {} monthly rows.",
        util::format_int(data.report.kept_rows)
    );
    if !data.report.missing_categories.is_empty() {
        println!(
            "Note: categories not in the sheet count as 0: {}",
            data.report.missing_categories.join(", ")
        );
    }
    println!();
    Ok(data)
}

fn export<T: Serialize + Tabled + Clone>(
    out_dir: &Path,
    file: &str,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    preview_rows: usize,
) {
    output::preview_table(title, note, rows, preview_rows);
    if rows.is_empty() {
        return;
    }
    let path = out_dir.join(file);
    match output::write_csv(&path, rows) {
        Ok(()) => println!("(Full table exported to {})\n", path.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

/// Generate every view for the current selection and parameters.
fn handle_generate_reports(
    session: &Session,
    dataset: &MeterDataset,
    sales_data: Option<&SalesDataset>,
    selection: &Selection,
    params: &LossParams,
    out_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let preview_rows = session.config.output.preview_rows;

    let opts = filter::options(&dataset.records);
    if let (Some(min), Some(max)) = (opts.min_period, opts.max_period) {
        println!(
            "Available: {} to {}, {} regions, {} usage types",
            min,
            max,
            opts.regions.len(),
            opts.usage_types.len()
        );
    }
    let selected: Vec<&DerivedRecord> = selection.apply(&dataset.records);
    info!(rows = selected.len(), "selection applied");
    println!("Selected rows: {}\n", util::format_int(selected.len()));

    if !dataset.capabilities.induction {
        println!("Conversion views skipped: billed-meter or gas-range column is missing.\n");
    } else {
        export(
            out_dir,
            "conversion_trend.csv",
            "Conversion Trend (monthly)",
            None,
            &reports::generate_trend(&selected),
            preview_rows,
        );
        if dataset.capabilities.usage_per_household {
            export(
                out_dir,
                "usage_correlation.csv",
                "Conversion Rate vs Usage per Household (region x month)",
                None,
                &reports::generate_correlation(&selected),
                preview_rows,
            );
        }
        export(
            out_dir,
            "region_ranking.csv",
            "Region Ranking (latest month)",
            None,
            &reports::generate_region_ranking(&selected),
            preview_rows,
        );
        export(
            out_dir,
            "usage_type_comparison.csv",
            "Usage Type Comparison (monthly)",
            None,
            &reports::generate_type_comparison(&selected),
            preview_rows,
        );
    }

    let summaries = if dataset.capabilities.induction {
        loss::yearly_summaries(&selected, &dataset.capabilities, params)
    } else {
        Vec::new()
    };
    if dataset.capabilities.induction {
        if !dataset.capabilities.usage {
            println!("Note: usage column is missing; yearly usage totals are shown as '-'.");
        }
        let note = format!(
            "December snapshot, {} m3/household/month",
            util::format_number(params.avg_monthly_usage, 1)
        );
        export(
            out_dir,
            "yearly_loss.csv",
            "Estimated Annual Loss",
            Some(note.as_str()),
            &reports::generate_yearly_loss(&summaries),
            preview_rows,
        );
    }

    if let Some(sales_data) = sales_data {
        let cats = session.config.sales.categories();
        let yearly = sales::yearly_sales(&sales_data.records, &cats);
        let merged = sales::reconcile(&summaries, &yearly);
        export(
            out_dir,
            "loss_vs_sales.csv",
            "Estimated Loss vs Reported Sales",
            None,
            &reports::generate_loss_vs_sales(&merged),
            preview_rows,
        );
    }

    let summary = reports::generate_summary(dataset, &selected, &summaries);
    let summary_path = out_dir.join("summary.json");
    if let Err(e) = output::write_json(&summary_path, &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary ({}):", summary_path.display());
    println!(
        "{{\"cumulative_loss_m3\": {}, \"latest_conversion_rate\": {}}}\n",
        util::format_number(summary.cumulative_loss_volume_m3, 0),
        summary
            .latest_conversion_rate
            .map(|r| util::format_number(r, 2))
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let mut params = config.loss_params();
    if let Some(usage) = args.usage {
        params.avg_monthly_usage = usage;
    }
    if let Some(price) = args.price {
        params.unit_price = Some(price);
    }
    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());

    let mut session = Session::new(config);
    let dataset = handle_load(&mut session, &args.meters)?;
    let sales_data = match &args.sales {
        Some(src) => Some(handle_load_sales(&mut session, src)?),
        None => None,
    };

    println!("Generating reports...\n");
    handle_generate_reports(
        &session,
        &dataset,
        sales_data.as_deref(),
        &selection_from(&args),
        &params,
        &out_dir,
    )
}
