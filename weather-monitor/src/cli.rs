use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::error;
use weather_core::{
    AlertEvaluator, ChartReporter, Config, LogReporter, Notifier, ProviderId, Reporter, Scheduler,
    SqliteSampleStore, SummaryMap, provider::default_provider_from_config, summarize_day,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-monitor", version, about = "Weather sampling, alerts and daily summaries")]
pub struct Cli {
    /// Configuration file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample all locations on the configured interval and summarize once a day.
    Run,

    /// Run a single sampling cycle and exit.
    Once,

    /// Summarize stored samples for one UTC day and report them.
    Summary {
        /// Day to summarize (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure { provider } => configure(&path, &provider),
            Command::Run => {
                let mut scheduler = build_scheduler(&Config::load_from(&path)?)?;
                scheduler.run_until(shutdown_signal()).await;
                Ok(())
            }
            Command::Once => {
                let mut scheduler = build_scheduler(&Config::load_from(&path)?)?;
                let cycle = scheduler.run_sample_task().await;
                println!(
                    "Fetched {}, stored {}, alerts sent {}, failed locations {}",
                    cycle.fetched, cycle.stored, cycle.alerts_sent, cycle.failures
                );
                Ok(())
            }
            Command::Summary { date } => {
                let date = match date {
                    Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .with_context(|| format!("Invalid date '{d}', expected YYYY-MM-DD"))?,
                    None => Utc::now().date_naive(),
                };

                let summaries = summarize_stored(&Config::load_from(&path)?, date)?;
                for s in summaries.iter() {
                    println!(
                        "{}: avg {:.1}C, max {:.1}C, min {:.1}C, {}",
                        s.location, s.avg_temp_c, s.max_temp_c, s.min_temp_c, s.dominant_condition
                    );
                }
                if summaries.is_empty() {
                    println!("No samples recorded on {date}.");
                }
                Ok(())
            }
        }
    }
}

/// Wire the configured collaborators into a scheduler.
fn build_scheduler(config: &Config) -> Result<Scheduler> {
    config.validate()?;

    let provider = default_provider_from_config(config)?;
    let store = open_store(config)?;

    let evaluator = AlertEvaluator::from_config(&config.alert);
    let notifier = Notifier::from_config(config.notifier.as_ref(), config.alert.threshold_c);

    let mut scheduler =
        Scheduler::new(config.locations.clone(), provider, Box::new(store), evaluator, notifier)
            .with_schedule(config.interval(), config.summary_time()?);

    for reporter in build_reporters(config) {
        scheduler = scheduler.with_reporter(reporter);
    }

    Ok(scheduler)
}

/// Summarize `date` from the sample database alone; no provider credentials are needed.
fn summarize_stored(config: &Config, date: NaiveDate) -> Result<SummaryMap> {
    config.validate()?;
    let store = open_store(config)?;
    Ok(summarize_day(&store, &config.locations, date, &build_reporters(config)))
}

fn open_store(config: &Config) -> Result<SqliteSampleStore> {
    let db_path = config.database_path()?;
    SqliteSampleStore::open(&db_path)
        .with_context(|| format!("Failed to open sample database: {}", db_path.display()))
}

fn build_reporters(config: &Config) -> Vec<Box<dyn Reporter>> {
    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(LogReporter)];
    if let Some(chart) = &config.summary.chart {
        reporters.push(Box::new(ChartReporter::new(chart)));
    }
    reporters
}

fn configure(path: &Path, provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load_from(path)?;

    let api_key = inquire::Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.upsert_provider_api_key(id, api_key);

    if config.default_provider_id().ok() != Some(id) {
        let make_default = inquire::Confirm::new(&format!("Use {id} as the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save_to(path)?;
    println!("Saved {id} credentials to {}", path.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
