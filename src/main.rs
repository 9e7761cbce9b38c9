// Entry point and high-level CLI flow.
//
// Every invocation is one full pass: load the (memoized) dataset, build the
// filter from the command line, filter, then either print the dashboard,
// list the filter options, or export the filtered rows.
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ride_dashboard::cache::{self, LoadedDataset};
use ride_dashboard::error::DashboardError;
use ride_dashboard::filter::{self, FilterOptions, FilterSpec};
use ride_dashboard::types::Dataset;
use ride_dashboard::util::{format_int, parse_date_safe};
use ride_dashboard::{kpi, output, reports};

const DEFAULT_DATA_PATH: &str = "cleaned_ola_rides.csv";
const DEFAULT_PREVIEW_ROWS: usize = 200;

#[derive(Parser)]
#[command(name = "ride_dashboard")]
#[command(about = "Filter and summarize ride-hailing trip records", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Ride CSV to load
    #[arg(long, global = true, env = "RIDES_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    #[command(flatten)]
    filters: FilterArgs,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Args)]
struct FilterArgs {
    /// First ride date (YYYYMMDD or YYYY-MM-DD), defaults to the earliest date
    #[arg(short, long, global = true)]
    since: Option<String>,

    /// Last ride date (YYYYMMDD or YYYY-MM-DD), defaults to the latest date
    #[arg(short, long, global = true)]
    until: Option<String>,

    /// Vehicle type to include (repeatable), defaults to all
    #[arg(long = "vehicle", global = true, value_name = "TYPE")]
    vehicles: Vec<String>,

    /// Booking status to include (repeatable), defaults to all
    #[arg(long = "status", global = true, value_name = "STATUS")]
    statuses: Vec<String>,

    /// Payment method to include (repeatable), defaults to all
    #[arg(long = "payment", global = true, value_name = "METHOD")]
    payments: Vec<String>,

    /// Case-insensitive search over Booking_ID, Customer_ID, Pickup/Drop
    #[arg(long, global = true, value_name = "TEXT")]
    search: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// KPIs, filtered data preview and every report (default)
    Report(ReportArgs),
    /// List the values each filter accepts
    Options {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Write the filtered rows to CSV (known columns only; extra source columns are not exported)
    Export {
        /// Destination file
        #[arg(short, long, default_value = output::EXPORT_FILE_NAME)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Hide the KPI cards
    #[arg(long)]
    no_kpis: bool,

    /// Rows of filtered data to preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    preview: usize,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Also write KPIs and reports to this JSON file
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            no_kpis: false,
            preview: DEFAULT_PREVIEW_ROWS,
            json: false,
            summary: None,
        }
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli_date(input: &str) -> Result<chrono::NaiveDate, DashboardError> {
    parse_date_safe(Some(input)).ok_or_else(|| DashboardError::InvalidDate {
        input: input.to_string(),
    })
}

/// Build the filter from the command line, falling back to "everything"
/// for each control left unset. `None` when there is no date to bound the
/// range with, which selects no rows.
fn build_spec(
    args: &FilterArgs,
    options: &FilterOptions,
) -> Result<Option<FilterSpec>, DashboardError> {
    let since = match &args.since {
        Some(s) => Some(parse_cli_date(s)?),
        None => options.min_date,
    };
    let until = match &args.until {
        Some(s) => Some(parse_cli_date(s)?),
        None => options.max_date,
    };
    let (Some(since), Some(until)) = (since, until) else {
        return Ok(None);
    };

    let or_all = |chosen: &[String], all: &[String]| -> Vec<String> {
        if chosen.is_empty() {
            all.to_vec()
        } else {
            chosen.to_vec()
        }
    };
    let spec = FilterSpec::new(since, until)?
        .with_vehicle_types(or_all(&args.vehicles, &options.vehicle_types))
        .with_booking_statuses(or_all(&args.statuses, &options.booking_statuses))
        .with_payment_methods(or_all(&args.payments, &options.payment_methods))
        .with_query(args.search.clone().unwrap_or_default());
    Ok(Some(spec))
}

fn filtered_view(
    dataset: &Dataset,
    args: &FilterArgs,
    options: &FilterOptions,
) -> Result<Dataset, DashboardError> {
    Ok(match build_spec(args, options)? {
        Some(spec) => filter::apply(dataset, &spec),
        None => dataset.with_records(Vec::new()),
    })
}

/// Print (or emit as JSON) the KPI cards, preview and every report.
fn handle_report(
    loaded: &LoadedDataset,
    filtered: &Dataset,
    args: &ReportArgs,
    search: Option<&str>,
) -> Result<(), DashboardError> {
    let kpis = kpi::compute(&loaded.dataset);
    let report_set = reports::run_all(filtered);

    if args.json || args.summary.is_some() {
        let reports_value = match &report_set {
            Some(set) => output::reports_json(set)?,
            None => serde_json::Value::Null,
        };
        let summary = json!({
            "kpis": kpis,
            "total_rows": loaded.dataset.len(),
            "filtered_rows": filtered.len(),
            "reports": reports_value,
        });
        if let Some(path) = &args.summary {
            output::write_json(path, &summary)?;
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
    }

    let report = &loaded.report;
    println!(
        "Processing dataset... ({} rows loaded, {} with unparsable Date)\n",
        format_int(report.total_rows),
        format_int(report.unparsed_timestamps)
    );
    if !report.derived_columns.is_empty() {
        let names: Vec<&str> = report.derived_columns.iter().map(|c| c.name()).collect();
        println!("Info: derived {} from Date.\n", names.join(", "));
    }

    if !args.no_kpis {
        output::print_kpis(&kpis);
    }
    if let Some(q) = search.filter(|q| !q.is_empty()) {
        println!("Searching for: {}\n", q);
    }

    println!(
        "Filtered data preview ({} of {} rows)\n",
        format_int(filtered.len()),
        format_int(loaded.dataset.len())
    );
    output::preview_records(filtered, args.preview);

    match &report_set {
        Some(set) => output::print_reports(set),
        None => println!("No data available for the selected filters.\n"),
    }
    Ok(())
}

fn handle_options(options: &FilterOptions, as_json: bool) -> Result<(), DashboardError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(options)?);
    } else {
        output::print_options(options);
    }
    Ok(())
}

fn handle_export(filtered: &Dataset, path: &Path) -> Result<(), DashboardError> {
    output::write_csv(path, filtered)?;
    println!(
        "Exported {} rows to {}",
        format_int(filtered.len()),
        path.display()
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), DashboardError> {
    let loaded = cache::global().get_or_load(&cli.data)?;
    let options = FilterOptions::from_dataset(&loaded.dataset);

    match &cli.command {
        Some(Command::Options { json }) => handle_options(&options, *json),
        Some(Command::Export { output }) => {
            let filtered = filtered_view(&loaded.dataset, &cli.filters, &options)?;
            handle_export(&filtered, output)
        }
        Some(Command::Report(args)) => {
            let filtered = filtered_view(&loaded.dataset, &cli.filters, &options)?;
            handle_report(&loaded, &filtered, args, cli.filters.search.as_deref())
        }
        None => {
            let filtered = filtered_view(&loaded.dataset, &cli.filters, &options)?;
            handle_report(
                &loaded,
                &filtered,
                &ReportArgs::default(),
                cli.filters.search.as_deref(),
            )
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
