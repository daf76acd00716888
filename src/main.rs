//! CLI entry point for the SEQ live bus tracker.
//!
//! Provides subcommands for resolving a single filtered snapshot, watching
//! the feeds on the refresh interval, and decoding a single feed for
//! inspection.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use seq_bus_tracker::{
    cascade::{CascadeMode, CascadeSelection, Choice},
    config::PipelineConfig,
    fetch::{BasicClient, FeedClient},
    output::{print_pretty, write_csv, write_json},
    parser::{decode_trip_updates, decode_vehicle_positions},
    pipeline::Pipeline,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "seq_bus_tracker")]
#[command(about = "Live SEQ bus positions with cascading filters", long_about = None)]
struct Cli {
    /// JSON pipeline config file (overrides SEQ_BUS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SelectionArgs {
    /// Region to show, or "All"
    #[arg(long, default_value = "Gold Coast")]
    region: String,

    /// Route name to show, or "All"
    #[arg(long, default_value = "700")]
    route: String,

    /// Delay status to show; repeat for several. Omit to show every status
    #[arg(long)]
    status: Vec<String>,

    /// Vehicle label to show, or "All"
    #[arg(long, default_value = "All")]
    vehicle: String,

    /// Offer every option at every level instead of cascading them
    #[arg(long, default_value_t = false)]
    independent: bool,
}

impl SelectionArgs {
    fn selection(&self) -> CascadeSelection {
        CascadeSelection {
            region: Choice::parse(Some(self.region.as_str())),
            route: Choice::parse(Some(self.route.as_str())),
            status: self.status.clone(),
            vehicle: Choice::parse(Some(self.vehicle.as_str())),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Pretty,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FeedArg {
    Vehicles,
    Trips,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both feeds once and print the filtered snapshot
    Query {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Re-run the query on the refresh interval
    Watch {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Seconds between cycles (defaults to the configured refresh interval)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        samples: usize,
    },
    /// Decode a single feed from a file or URL and print its records
    Decode {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Which feed the bytes hold
        #[arg(long, value_enum)]
        feed: FeedArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/seq_bus_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("seq_bus_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug")),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_env()?,
    };

    match cli.command {
        Commands::Query { selection, format } => query(config, &selection, format).await?,
        Commands::Watch {
            selection,
            interval,
            samples,
        } => watch(config, &selection, interval, samples).await?,
        Commands::Decode { source, feed } => decode(&config, &source, feed).await?,
    }

    Ok(())
}

fn build_pipeline(mut config: PipelineConfig, args: &SelectionArgs) -> Result<Pipeline<BasicClient>> {
    if args.independent {
        config.cascade_mode = CascadeMode::Independent;
    }
    Pipeline::from_config(config)
}

/// Runs one cycle and writes the result to stdout.
async fn query(config: PipelineConfig, args: &SelectionArgs, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(config, args)?;

    let snapshot = match pipeline.run(&args.selection()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(
                error = %e,
                feed = %e.feed(),
                retryable = e.is_retryable(),
                "Live bus data unavailable"
            );
            return Err(e.into());
        }
    };

    info!(tracked = snapshot.tracked_count(), "Snapshot ready");

    let stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(stdout, &snapshot)?,
        OutputFormat::Csv => write_csv(stdout, &snapshot.result.records)?,
        OutputFormat::Pretty => print_pretty(stdout, &snapshot)?,
    }
    Ok(())
}

/// Re-runs the query every interval. A failed cycle is logged and retried on
/// the next tick.
#[tracing::instrument(skip(config, args))]
async fn watch(
    config: PipelineConfig,
    args: &SelectionArgs,
    interval: Option<u64>,
    samples: usize,
) -> Result<()> {
    let period = interval
        .map(std::time::Duration::from_secs)
        .unwrap_or(config.refresh_interval);
    anyhow::ensure!(!period.is_zero(), "watch interval must be positive");
    let pipeline = build_pipeline(config, args)?;
    let selection = args.selection();

    if samples == 0 {
        info!(period_secs = period.as_secs(), "Watching feeds. Press Ctrl+C to stop.");
    } else {
        info!(samples, period_secs = period.as_secs(), "Starting watch");
    }

    let mut ticker = tokio::time::interval(period);
    let mut cycle = 0usize;

    loop {
        if samples > 0 && cycle >= samples {
            break;
        }
        ticker.tick().await;
        cycle += 1;

        match pipeline.run(&selection).await {
            Ok(snapshot) => {
                let result = &snapshot.result;
                info!(
                    cycle,
                    fetched_at = %snapshot.fetched_at,
                    next_refresh_at = %snapshot.next_refresh_at,
                    tracked = snapshot.tracked_count(),
                    routes = result.route_options.len().saturating_sub(1),
                    statuses = ?result.effective.status,
                    "Cycle complete"
                );
                if result.records.is_empty() {
                    warn!(cycle, "No buses match the current filter");
                }
            }
            Err(e) => {
                error!(cycle, error = %e, retryable = e.is_retryable(), "Cycle failed, will retry on next interval");
            }
        }
    }

    info!(cycles = cycle, "Watch finished");
    Ok(())
}

/// Decodes one feed from a local file or URL and prints its records as JSON.
#[tracing::instrument(skip(config))]
async fn decode(config: &PipelineConfig, source: &str, feed: FeedArg) -> Result<()> {
    let bytes = if source.starts_with("http") {
        let client = FeedClient::new(BasicClient::new(), config.fetch_timeout);
        client.fetch(source).await?.to_vec()
    } else {
        std::fs::read(source)?
    };

    let json = match feed {
        FeedArg::Vehicles => {
            let vehicles = decode_vehicle_positions(&bytes)?;
            info!(count = vehicles.len(), "Decoded vehicle positions");
            serde_json::to_string_pretty(&vehicles)?
        }
        FeedArg::Trips => {
            let updates = decode_trip_updates(&bytes, &config.delay_thresholds)?;
            info!(count = updates.len(), "Decoded trip updates");
            serde_json::to_string_pretty(&updates)?
        }
    };
    println!("{json}");
    Ok(())
}
