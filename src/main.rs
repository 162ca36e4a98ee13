use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pingr_tracker::dataset::import_dataset;
use pingr_tracker::pipeline::clean;
use pingr_tracker::report::{build_report, load_momentum_summary};
use pingr_tracker::{DatasetStatus, TrackerConfig};
use std::path::PathBuf;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pingr-tracker")]
#[command(about = "Clean Pingr alert logs and report signal statistics")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize the alert log and write the cleaned dataset
    Clean {
        /// Newline-delimited JSON alert log (.jsonl or .jsonl.zst)
        #[arg(short, long, env = "PINGR_LOG_FILE", default_value = "alert_log.jsonl")]
        log: PathBuf,

        /// Cleaned dataset output (overwritten)
        #[arg(short, long, env = "PINGR_OUTPUT", default_value = "pingr_cleaned_data.csv")]
        output: PathBuf,
    },

    /// Load the cleaned dataset and print the report
    Report {
        /// Cleaned dataset to read
        #[arg(short, long, env = "PINGR_OUTPUT", default_value = "pingr_cleaned_data.csv")]
        dataset: PathBuf,

        #[command(flatten)]
        opts: ReportOpts,
    },

    /// Clean, then report
    Run {
        #[arg(short, long, env = "PINGR_LOG_FILE", default_value = "alert_log.jsonl")]
        log: PathBuf,

        #[arg(short, long, env = "PINGR_OUTPUT", default_value = "pingr_cleaned_data.csv")]
        output: PathBuf,

        #[command(flatten)]
        opts: ReportOpts,
    },
}

#[derive(clap::Args, Debug)]
struct ReportOpts {
    /// Momentum summary JSON, merged into the report when present
    #[arg(short, long, env = "PINGR_MOMENTUM_SUMMARY", default_value = "momentum_summary.json")]
    summary: PathBuf,

    /// Number of top symbols
    #[arg(long, default_value = "10")]
    top: usize,

    /// Number of weakest symbols
    #[arg(long, default_value = "10")]
    bottom: usize,

    /// Number of rejection reasons
    #[arg(long, default_value = "15")]
    reasons: usize,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let directive = if args.verbose { "pingr_tracker=debug" } else { "pingr_tracker=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);
    let _guard = span.enter();

    match args.command {
        Commands::Clean { log, output } => {
            let config = TrackerConfig { log_path: log, output_path: output, ..Default::default() };
            run_clean(&config)
        }
        Commands::Report { dataset, opts } => {
            let config = opts.to_config(dataset);
            run_report(&config, opts.format)
        }
        Commands::Run { log, output, opts } => {
            let mut config = opts.to_config(output);
            config.log_path = log;
            run_clean(&config)?;
            run_report(&config, opts.format)
        }
    }
}

impl ReportOpts {
    fn to_config(&self, dataset: PathBuf) -> TrackerConfig {
        TrackerConfig {
            output_path: dataset,
            summary_path: self.summary.clone(),
            top_n: self.top,
            bottom_n: self.bottom,
            reason_limit: self.reasons,
            ..Default::default()
        }
    }
}

fn run_clean(config: &TrackerConfig) -> Result<()> {
    info!("=== CLEAN ===");
    let summary = clean(&config.log_path, &config.output_path)?;

    info!(
        "Cleaned {} rows ({} dropped) -> {:?}",
        summary.rows, summary.dropped_lines, summary.output
    );
    if !summary.pass_through_columns.is_empty() {
        info!("Pass-through columns: {}", summary.pass_through_columns.join(", "));
    }
    Ok(())
}

fn run_report(config: &TrackerConfig, format: OutputFormat) -> Result<()> {
    info!("=== REPORT ===");
    let records = import_dataset(&config.output_path)?;
    let momentum = load_momentum_summary(&config.summary_path);
    let report = build_report(&records, config, momentum);

    match report.status {
        DatasetStatus::Empty => warn!("Cleaned dataset has no rows"),
        DatasetStatus::NoAlerts => warn!("Loaded {} rows, none with a sent alert", report.total_entries),
        DatasetStatus::Loaded => info!(
            "Loaded {} rows, {} alerts",
            report.total_entries, report.total_alerts
        ),
    }

    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
