use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod dataset;
mod filter;
mod models;
mod normalize;
mod report;

use config::{Config, OutputFormat};
use dataset::Dataset;
use filter::DateRange;

#[derive(Parser)]
#[command(name = "training-report")]
#[command(about = "Training evaluation reports per evaluated advisor", long_about = None)]
struct Cli {
    /// CSV or JSON export of the evaluation spreadsheet
    #[arg(long, global = true, env = "TRAINING_DATA")]
    data: Option<PathBuf>,
    /// Configuration file (defaults to ./.training-report.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    InitConfig {
        #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
        out: PathBuf,
    },
    /// List the evaluated advisors found in the dataset
    Advisors,
    /// Show the first and last session dates in the dataset
    Dates,
    /// Build the report for one advisor
    Report {
        #[arg(long)]
        advisor: String,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize every advisor in one table
    Overview {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::InitConfig { out } => {
            if out.exists() {
                bail!("{} already exists; edit it or remove it first", out.display());
            }
            std::fs::write(&out, Config::default_toml()?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Default configuration written to {}.", out.display());
        }
        Commands::Advisors => {
            let dataset = load_dataset(cli.data, &config)?;
            let sessions = normalize::normalize_dataset(&dataset, &config.schema);
            let advisors = report::list_advisors(&sessions);

            if advisors.is_empty() {
                println!("No advisors recorded in this dataset.");
            }
            for advisor in advisors {
                println!("{advisor}");
            }
        }
        Commands::Dates => {
            let dataset = load_dataset(cli.data, &config)?;
            let sessions = normalize::normalize_dataset(&dataset, &config.schema);

            match filter::date_bounds(&sessions) {
                Some(bounds) => println!(
                    "{} to {}",
                    report::format_date(Some(bounds.start), &config.display),
                    report::format_date(Some(bounds.end), &config.display)
                ),
                None => println!("No dated sessions in this dataset."),
            }
        }
        Commands::Report {
            advisor,
            from,
            to,
            format,
            out,
        } => {
            let dataset = load_dataset(cli.data, &config)?;
            let built = report::build_report(&dataset, &config.schema, &advisor, from, to);

            let rendered = match format.unwrap_or(config.display.format) {
                OutputFormat::Markdown => report::render_markdown(&built, &config.display),
                OutputFormat::Json => report::render_json(&built)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Overview { from, to } => {
            let dataset = load_dataset(cli.data, &config)?;
            let sessions = normalize::normalize_dataset(&dataset, &config.schema);
            let range = DateRange::resolve(from, to, filter::date_bounds(&sessions));
            print!(
                "{}",
                report::render_overview(&sessions, range, &config.display)
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn load_dataset(cli_path: Option<PathBuf>, config: &Config) -> anyhow::Result<Dataset> {
    let path = cli_path
        .or_else(|| config.data.path.clone())
        .context("no dataset given: pass --data, set TRAINING_DATA, or set [data] path")?;

    let dataset = Dataset::from_path(&path)?;
    dataset.require_column(&config.schema.columns.advisor)?;
    if dataset.is_empty() {
        warn!(path = %path.display(), "dataset has no rows");
    }
    Ok(dataset)
}
