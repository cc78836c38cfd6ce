//! settle - cloud cost settlement reports
//!
//! Reads cost exports for the purchase (input) and sales (resale) side,
//! computes the MSP fee split and shows USD figures next to KRW.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize one upload
//! settle summarize january.csv january-2.csv
//!
//! # Two-stream report with the official rate of a date
//! settle report --input invoice.csv --resale billing.csv --rate-date 2024-01-31
//!
//! # Same, with the rate from the Korea Eximbank API instead of SMBS
//! settle report --input invoice.csv --resale billing.csv --rate-date 2024-01-31 --rate-source koreaexim
//!
//! # Same, with a manual rate, exported for offline use
//! settle report --input invoice.csv --resale billing.csv --rate 1,320.50 --export-dir ./out
//!
//! # Fee split for an amount
//! settle fees 18500
//! ```

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use settle_core::{LogGuard, SettleError, init_logging};
use settle_cost::{AppState, CostError, Normalizer, SortField, SortOrder, SourceStream};
use settle_rates::{RateClientConfig, RateError, RateProvider};
use tracing::{error, info};

use crate::commands::{RateChoice, RecordFilter};
use crate::config::AppConfig;

/// Cloud cost settlement reports
///
/// Ingests cost export CSVs, removes duplicate lines, splits MSP fees and
/// converts USD to KRW.
#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.settle/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.settle/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize one upload batch
    Summarize {
        /// CSV files, processed as one batch
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Settlement report over both streams
    Report {
        #[command(flatten)]
        streams: StreamArgs,

        #[command(flatten)]
        rate: RateArgs,

        /// Write JSON and CSV snapshots into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Write snapshots into the configured export directory
        #[arg(long)]
        export: bool,

        /// Print the snapshot as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List records with filters, sorting and paging
    Records {
        #[command(flatten)]
        streams: StreamArgs,

        #[command(flatten)]
        rate: RateArgs,

        /// Only these services (repeatable)
        #[arg(long = "service")]
        services: Vec<String>,

        /// Only this environment
        #[arg(long = "env")]
        environment: Option<String>,

        /// First date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only one stream (input or resale)
        #[arg(long)]
        stream: Option<SourceStream>,

        /// Sort by date, cost, service or environment
        #[arg(long, default_value = "date")]
        sort: SortField,

        /// Sort ascending (default is descending)
        #[arg(long)]
        asc: bool,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Records per page
        #[arg(long, default_value_t = settle_cost::query::DEFAULT_PER_PAGE)]
        per_page: usize,
    },

    /// MSP fee split for a non-custom-charge amount in USD
    Fees {
        amount: String,

        /// KRW per USD to also show KRW figures
        #[arg(long)]
        rate: Option<String>,
    },

    /// Fetch the official USD/KRW rate
    Rate {
        /// Publication date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Rate provider (smbs or koreaexim); overrides the configuration
        #[arg(long)]
        source: Option<RateProvider>,
    },
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Vendor invoice exports (purchase side)
    #[arg(long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Customer billing exports (sales side)
    #[arg(long, num_args = 1..)]
    resale: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct RateArgs {
    /// Manual KRW per USD rate, e.g. 1,320.50
    #[arg(long, conflicts_with = "rate_date")]
    rate: Option<String>,

    /// Fetch the official rate published on this date
    #[arg(long)]
    rate_date: Option<NaiveDate>,

    /// Provider for --rate-date (smbs or koreaexim); overrides the configuration
    #[arg(long, requires = "rate_date")]
    rate_source: Option<RateProvider>,
}

impl RateArgs {
    fn choice(&self) -> RateChoice {
        match (&self.rate, self.rate_date) {
            (Some(rate), _) => RateChoice::Manual(rate.clone()),
            (None, Some(date)) => RateChoice::Fetch(date),
            (None, None) => RateChoice::None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("settle failed: {:#}", e);
            eprintln!("{}", friendly_error(&e));
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> settle_core::Result<LogGuard> {
    let debug = cli.verbose > 0;
    init_logging(cli.log_dir.clone(), debug)
}

/// User-facing text for an error from any settle crate.
pub(crate) fn friendly_error(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<CostError>() {
        e.friendly_message()
    } else if let Some(e) = err.downcast_ref::<RateError>() {
        e.friendly_message()
    } else if let Some(e) = err.downcast_ref::<SettleError>() {
        match e.guidance() {
            Some(hint) => format!("Error: {}\n  {}", e, hint),
            None => format!("Error: {}", e),
        }
    } else {
        format!("Error: {:#}", err)
    }
}

/// Rate client settings with a command-line provider override applied.
fn rate_config(base: &RateClientConfig, provider: Option<RateProvider>) -> RateClientConfig {
    match provider {
        Some(provider) => base.clone().with_provider(provider),
        None => base.clone(),
    }
}

async fn load_state(config: &AppConfig, streams: &StreamArgs, rate: &RateArgs) -> Result<AppState> {
    let normalizer = Normalizer::with_config(config.normalizer.clone());
    let mut state = AppState::new();

    if !streams.input.is_empty() {
        let data = commands::load_stream(&streams.input, Some(SourceStream::Input), &normalizer).await?;
        state = state.with_stream(data);
    }
    if !streams.resale.is_empty() {
        let data = commands::load_stream(&streams.resale, Some(SourceStream::Resale), &normalizer).await?;
        state = state.with_stream(data);
    }
    if state.is_empty() {
        anyhow::bail!("no input files: pass --input and/or --resale");
    }

    let rates = rate_config(&config.rates, rate.rate_source);
    if let Some(applied) = commands::resolve_rate(&rate.choice(), &rates).await? {
        state = state.with_rate(applied);
    }

    Ok(state)
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(command = ?cli.command, "Starting settle");

    match cli.command {
        Command::Summarize { files, json } => {
            let normalizer = Normalizer::with_config(config.normalizer.clone());
            let data = commands::load_stream(&files, None, &normalizer).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&data.summary)?);
            } else {
                println!("{}", commands::render_summary("Upload", &data, None));
            }
        }
        Command::Report {
            streams,
            rate,
            export_dir,
            export,
            json,
        } => {
            let state = load_state(&config, &streams, &rate).await?;
            if json {
                let snapshot = settle_cost::ReportSnapshot::capture(&state);
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("{}", commands::render_report(&state));
            }
            let export_dir = export_dir.or_else(|| export.then(|| config.report.export_dir.clone()));
            if let Some(dir) = export_dir {
                commands::export_state(&state, &dir)?;
            }
        }
        Command::Records {
            streams,
            rate,
            services,
            environment,
            from,
            to,
            stream,
            sort,
            asc,
            page,
            per_page,
        } => {
            let state = load_state(&config, &streams, &rate).await?;
            let filter = RecordFilter {
                services,
                environment,
                from,
                to,
                stream,
            };
            let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
            let result = commands::build_query(&filter)
                .with_sort(sort, order)
                .with_page(page, per_page)
                .run(&state.converted_records());
            println!("{}", commands::render_page(&result));
        }
        Command::Fees { amount, rate } => {
            println!("{}", commands::fees_for_amount(&amount, rate.as_deref())?);
        }
        Command::Rate { date, source } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let rates = rate_config(&config.rates, source);
            let applied = commands::fetch_rate(&rates, date).await?;
            let rate_date = applied.rate_date.unwrap_or(date);
            println!(
                "{} KRW/{} on {} ({})",
                applied.rate, rates.currency, rate_date, applied.source
            );
        }
    }

    Ok(())
}
