use anyhow::{Context, Result};
use citycast_core::{
    City, Config, CsvSink, Overrides, Pipeline, RecordType, RunOptions, Settings,
    WeatherApiClient,
    dates::local_today,
    input::read_cities,
    pipeline::{DEFAULT_FORECAST_DAYS, DEFAULT_HISTORY_DAYS},
    show::{lookup, render_alerts},
    sink::DEFAULT_OUTPUT_FILE,
    summary::{read_csv, render_summary, summarize},
    table::render_table,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::{io, path::PathBuf, sync::Arc};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "citycast",
    version,
    about = "Collect past, current and forecast weather for a list of cities into one CSV file"
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). Falls back to RUST_LOG.
    #[arg(short, long, global = true)]
    pub level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com API key and run defaults.
    Configure {
        /// API key; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,

        /// Default number of workers.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Default barrier interval, in cities.
        #[arg(long)]
        sync_every: Option<usize>,
    },

    /// Fetch weather for each city and write every record to a CSV file.
    Run(RunArgs),

    /// Show the weather for one city: current, on a past day, or forecast.
    Show(ShowArgs),

    /// Summarize a CSV file written by `run`.
    Summary {
        /// File to read.
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
        input: PathBuf,

        /// Only this city (case-insensitive).
        #[arg(long)]
        city: Option<String>,

        /// Only this record type: history, current or forecast.
        #[arg(long = "type")]
        record_type: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// City names. When none are given they are read from standard input.
    pub cities: Vec<String>,

    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of parallel workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Make all workers wait for each other after every N cities.
    #[arg(long)]
    pub sync_every: Option<usize>,

    /// Per-request timeout in seconds. No timeout when unset.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output CSV file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
    pub history_days: u32,

    #[arg(long, default_value_t = DEFAULT_FORECAST_DAYS)]
    pub forecast_days: u32,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub city: String,

    /// Day to show (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Skip the weather alerts lookup.
    #[arg(long)]
    pub no_alerts: bool,

    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl ShowArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            ..Overrides::default()
        }
    }
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            workers: self.workers,
            sync_every: self.sync_every,
            timeout_secs: self.timeout_secs,
            output: self.output.clone(),
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { api_key, workers, sync_every } => {
                configure(api_key, workers, sync_every)
            }
            Command::Run(args) => run(args).await,
            Command::Show(args) => show(args).await,
            Command::Summary { input, city, record_type } => summary(input, city, record_type),
        }
    }
}

fn configure(
    api_key: Option<String>,
    workers: Option<usize>,
    sync_every: Option<usize>,
) -> Result<()> {
    let mut config = Config::load()?;

    let api_key = match api_key {
        Some(key) => key,
        None => inquire::Password::new("WeatherAPI.com API key:")
            .without_confirmation()
            .with_help_message("Get one at https://www.weatherapi.com/my/")
            .prompt()
            .context("Failed to read API key")?,
    };
    config.set_api_key(api_key.trim().to_string());

    if workers.is_some() {
        config.workers = workers;
    }
    if sync_every.is_some() {
        config.sync_every = sync_every;
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let settings = config.resolve(args.overrides())?;

    let cities: Vec<City> = if args.cities.is_empty() {
        read_cities(io::stdin().lock(), io::stdout())?
    } else {
        args.cities.iter().map(|c| City::new(c.as_str())).collect()
    };

    let sink = CsvSink::create(&settings.output).inspect_err(|_| {
        println!("❌ Error creating CSV file.");
    })?;

    let client = client_for(&settings)?;

    let options = RunOptions {
        workers: settings.workers,
        sync_every: settings.sync_every,
        history_days: args.history_days,
        forecast_days: args.forecast_days,
        today: local_today(),
    };
    info!("writing to {}", settings.output.display());

    let summary = Pipeline::new(Arc::new(client), options)?.run(cities, sink).await?;

    if summary.failed_fetches > 0 || summary.skipped_entries > 0 {
        warn!(
            "{} fetches failed and {} responses or entries were skipped; see log above",
            summary.failed_fetches, summary.skipped_entries
        );
    }
    println!(
        "\n🌦️ All city data saved successfully in '{}' ({} records)",
        settings.output.display(),
        summary.records_written
    );
    Ok(())
}

async fn show(args: ShowArgs) -> Result<()> {
    let settings = Config::load()?.resolve(args.overrides())?;
    let client = client_for(&settings)?;
    let city = City::new(args.city.trim());

    let report = lookup(&client, &city, local_today(), args.date, !args.no_alerts).await?;

    println!("\n{} - {}", report.title(), report.city);
    print!("{}", render_table(report.city.as_str(), report.record_type(), &report.records));
    if let Some(alerts) = &report.alerts {
        print!("{}", render_alerts(alerts));
    }
    Ok(())
}

fn client_for(settings: &Settings) -> Result<WeatherApiClient> {
    let client = WeatherApiClient::new(settings.api_key.clone()).with_base_url(&settings.base_url);
    match settings.timeout {
        Some(timeout) => client.with_timeout(timeout),
        None => Ok(client),
    }
}

fn summary(input: PathBuf, city: Option<String>, record_type: Option<String>) -> Result<()> {
    let record_type = record_type.as_deref().map(RecordType::try_from).transpose()?;
    let records = read_csv(&input)?;

    let summaries = summarize(&records, city.as_deref(), record_type);
    if summaries.is_empty() {
        println!("⚠️ No data available for the selected filters.");
        return Ok(());
    }
    print!("{}", render_summary(&summaries));
    Ok(())
}
