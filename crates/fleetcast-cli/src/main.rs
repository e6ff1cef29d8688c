//! # fleetcast-cli
//!
//! Command-line front end for the fleetcast pipeline: build a demand series
//! from trip records, forecast it, derive a dispatch schedule, and deliver
//! the schedule to the external ordering endpoint.

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use clap::{Parser, Subcommand};
use fleetcast_core::prelude::*;
use fleetcast_data::{load_trip_records, StopDirectory, TickerClient};
use fleetcast_delivery::{save_delivery_log, DeliveryPipeline, HttpOrderSink};

/// Environment variable holding the ordering endpoint's API key
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default ordering endpoint
const DEFAULT_ORDER_ENDPOINT: &str = "https://api.gemini.com/v1/order/new";

type CliResult<T> = std::result::Result<T, String>;

#[derive(Parser)]
#[command(name = "fleetcast")]
#[command(about = "Transit demand forecasting and dispatch CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast demand from historical trip records
    Forecast {
        /// Trip-record CSV (arrival_time, departure_time, bus_stop[, device_id])
        #[arg(short, long)]
        input: PathBuf,

        /// Only use records for this stop
        #[arg(long)]
        stop: Option<String>,

        /// Bucket width in minutes
        #[arg(long, default_value = "60")]
        bucket_minutes: i64,

        /// Per-bucket aggregation (mean, median, max, count)
        #[arg(long, default_value = "mean")]
        aggregator: String,

        /// Number of buckets to forecast
        #[arg(long, default_value = "24")]
        horizon: usize,

        /// Buckets per seasonal cycle
        #[arg(long, default_value = "24")]
        period: usize,

        /// Fall back to a moving average when the seasonal fit fails
        #[arg(long)]
        fallback: bool,

        /// Trailing window for the fallback forecaster
        #[arg(long, default_value = "6")]
        fallback_window: usize,

        /// Write the forecast as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive a dispatch schedule from the forecast
    Schedule {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        stops: Option<PathBuf>,

        #[arg(long)]
        stop: Option<String>,

        #[arg(long, default_value = "60")]
        bucket_minutes: i64,

        #[arg(long, default_value = "mean")]
        aggregator: String,

        #[arg(long, default_value = "24")]
        horizon: usize,

        #[arg(long, default_value = "24")]
        period: usize,

        #[arg(long)]
        fallback: bool,

        #[arg(long, default_value = "6")]
        fallback_window: usize,

        /// Forecast value above which a period is classified peak
        #[arg(long)]
        peak_threshold: f64,

        /// Off-peak dispatch interval in minutes
        #[arg(long, default_value = "10")]
        base_interval: u32,

        /// Peak dispatch interval in minutes
        #[arg(long, default_value = "20")]
        peak_interval: u32,

        /// Minutes added to every interval under external load
        #[arg(long, default_value = "5")]
        load_penalty: u32,

        /// External-load threshold (defaults to the peak threshold)
        #[arg(long)]
        load_threshold: Option<f64>,

        /// Ticker symbol for the live load signal (omit to skip the read)
        #[arg(long)]
        symbol: Option<String>,

        /// Load value assumed when the signal is missing or unreadable
        #[arg(long, default_value = "0.0")]
        load_default: f64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive the schedule and deliver it to the ordering endpoint
    Dispatch {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        stops: Option<PathBuf>,

        #[arg(long)]
        stop: Option<String>,

        #[arg(long, default_value = "60")]
        bucket_minutes: i64,

        #[arg(long, default_value = "mean")]
        aggregator: String,

        #[arg(long, default_value = "24")]
        horizon: usize,

        #[arg(long, default_value = "24")]
        period: usize,

        #[arg(long)]
        fallback: bool,

        #[arg(long, default_value = "6")]
        fallback_window: usize,

        #[arg(long)]
        peak_threshold: f64,

        #[arg(long, default_value = "10")]
        base_interval: u32,

        #[arg(long, default_value = "20")]
        peak_interval: u32,

        #[arg(long, default_value = "5")]
        load_penalty: u32,

        #[arg(long)]
        load_threshold: Option<f64>,

        #[arg(long)]
        symbol: Option<String>,

        #[arg(long, default_value = "0.0")]
        load_default: f64,

        /// Ordering endpoint URL
        #[arg(long, default_value = DEFAULT_ORDER_ENDPOINT)]
        endpoint: String,

        /// Minimum seconds between delivery attempts
        #[arg(long, default_value = "60")]
        min_interval_secs: u64,

        /// Delivery-log CSV path
        #[arg(long, default_value = "delivery_log.csv")]
        log: PathBuf,
    },
}

fn parse_aggregator(name: &str) -> CliResult<Aggregator> {
    match name.to_lowercase().as_str() {
        "mean" => Ok(Aggregator::Mean),
        "median" => Ok(Aggregator::Median),
        "max" => Ok(Aggregator::Max),
        "count" => Ok(Aggregator::Count),
        _ => Err(format!(
            "Unknown aggregator: {}. Use 'mean', 'median', 'max' or 'count'",
            name
        )),
    }
}

/// Load trip records and build the demand series.
fn build_series(
    input: &PathBuf,
    stop: Option<&str>,
    bucket_minutes: i64,
    aggregator: &str,
) -> CliResult<DemandSeries> {
    let mut records = load_trip_records(input).map_err(|e| e.to_string())?;
    if let Some(stop) = stop {
        records.retain(|r| r.stop_id == stop);
        if records.is_empty() {
            return Err(format!("No records for stop '{}'", stop));
        }
    }
    println!(
        "Loaded {} trip records from {:?}",
        records.len(),
        input.file_name().unwrap_or_default()
    );

    SeriesBuilder::new()
        .with_bucket_interval(ChronoDuration::minutes(bucket_minutes))
        .map_err(|e| e.to_string())?
        .with_aggregator(parse_aggregator(aggregator)?)
        .build(&records)
        .map_err(|e| format!("Series builder: {}", e))
}

/// Fit the seasonal model, optionally degrading to the moving average.
fn make_forecast(
    series: &DemandSeries,
    horizon: usize,
    period: usize,
    fallback: bool,
    fallback_window: usize,
) -> CliResult<(Forecast, &'static str)> {
    match fit_and_forecast(series, horizon, period) {
        Ok(forecast) => Ok((forecast, "Holt-Winters")),
        Err(err @ TransitError::ModelFit { .. }) if fallback => {
            tracing::warn!(error = %err, "seasonal fit failed, using moving-average fallback");
            let forecast = fallback_forecast(series, horizon, fallback_window)
                .map_err(|e| format!("Fallback forecaster: {}", e))?;
            Ok((forecast, "Moving average (fallback)"))
        }
        Err(e) => Err(format!("Forecaster: {}", e)),
    }
}

/// Scaled console bar for the forecast chart.
fn render_bar(value: f64, max: f64) -> String {
    const WIDTH: f64 = 40.0;
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    "#".repeat((value / max * WIDTH).round() as usize)
}

fn print_forecast(forecast: &Forecast, model_name: &str) {
    let max = forecast.values().iter().copied().fold(f64::MIN, f64::max);
    println!("Model: {}", model_name);
    println!("Forecast ({} buckets):", forecast.len());
    for point in forecast.points() {
        println!(
            "  {}  {:10.1}  {}",
            point.timestamp.format("%Y-%m-%d %H:%M"),
            point.value,
            render_bar(point.value, max)
        );
    }
}

fn print_schedule(schedule: &[ScheduleEntry], stops: &StopDirectory) {
    println!("Schedule ({} entries):", schedule.len());
    println!("  Departure            Interval  Peak  Forecast  Stop");
    for entry in schedule {
        println!(
            "  {}  {:>5} min  {:>4}  {:8.1}  {}",
            entry.departs_at.format("%Y-%m-%d %H:%M"),
            entry.interval_minutes,
            if entry.peak { "yes" } else { "no" },
            entry.forecast_value,
            entry
                .stop_id
                .as_deref()
                .map(|id| stops.label(id))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

fn write_json(path: &PathBuf, value: &serde_json::Value) -> CliResult<()> {
    let mut file = File::create(path).map_err(|e| format!("Failed to create output: {}", e))?;
    serde_json::to_writer_pretty(&mut file, value)
        .map_err(|e| format!("Failed to write JSON: {}", e))?;
    println!("Results written to {:?}", path);
    Ok(())
}

fn load_stop_directory(stops: Option<&PathBuf>) -> CliResult<StopDirectory> {
    match stops {
        Some(path) => StopDirectory::load(path).map_err(|e| e.to_string()),
        None => Ok(StopDirectory::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn derive(
    forecast: &Forecast,
    stop: Option<&str>,
    peak_threshold: f64,
    base_interval: u32,
    peak_interval: u32,
    load_penalty: u32,
    load_threshold: Option<f64>,
    symbol: Option<&str>,
    load_default: f64,
) -> Vec<ScheduleEntry> {
    let mut policy = SchedulePolicy::new(peak_threshold)
        .with_intervals(base_interval, peak_interval)
        .with_load_penalty(load_penalty)
        .with_load_default(load_default)
        .with_assignment(stop.map(String::from), None);
    if let Some(threshold) = load_threshold {
        policy = policy.with_load_threshold(threshold);
    }

    match symbol {
        Some(symbol) => {
            let ticker = TickerClient::new(symbol);
            policy.derive_schedule(forecast, &ticker)
        }
        None => policy.derive_schedule(forecast, &FixedLoad(load_default)),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_forecast(
    input: PathBuf,
    stop: Option<String>,
    bucket_minutes: i64,
    aggregator: String,
    horizon: usize,
    period: usize,
    fallback: bool,
    fallback_window: usize,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let series = build_series(&input, stop.as_deref(), bucket_minutes, &aggregator)?;
    println!(
        "Series: {} buckets of {} min, ending {}",
        series.len(),
        series.interval().num_minutes(),
        series.last_timestamp().format("%Y-%m-%d %H:%M")
    );

    let (forecast, model_name) = make_forecast(&series, horizon, period, fallback, fallback_window)?;
    print_forecast(&forecast, model_name);

    if let Some(path) = output {
        let json = serde_json::json!({
            "model": model_name,
            "horizon": forecast.len(),
            "points": forecast.points(),
        });
        write_json(&path, &json)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_schedule(
    input: PathBuf,
    stops: Option<PathBuf>,
    stop: Option<String>,
    bucket_minutes: i64,
    aggregator: String,
    horizon: usize,
    period: usize,
    fallback: bool,
    fallback_window: usize,
    peak_threshold: f64,
    base_interval: u32,
    peak_interval: u32,
    load_penalty: u32,
    load_threshold: Option<f64>,
    symbol: Option<String>,
    load_default: f64,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let directory = load_stop_directory(stops.as_ref())?;
    let series = build_series(&input, stop.as_deref(), bucket_minutes, &aggregator)?;
    let (forecast, model_name) = make_forecast(&series, horizon, period, fallback, fallback_window)?;

    let schedule = derive(
        &forecast,
        stop.as_deref(),
        peak_threshold,
        base_interval,
        peak_interval,
        load_penalty,
        load_threshold,
        symbol.as_deref(),
        load_default,
    );

    println!("Model: {}", model_name);
    print_schedule(&schedule, &directory);

    if let Some(path) = output {
        let json = serde_json::json!({
            "model": model_name,
            "peak_threshold": peak_threshold,
            "entries": schedule,
        });
        write_json(&path, &json)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_dispatch(
    input: PathBuf,
    stops: Option<PathBuf>,
    stop: Option<String>,
    bucket_minutes: i64,
    aggregator: String,
    horizon: usize,
    period: usize,
    fallback: bool,
    fallback_window: usize,
    peak_threshold: f64,
    base_interval: u32,
    peak_interval: u32,
    load_penalty: u32,
    load_threshold: Option<f64>,
    symbol: Option<String>,
    load_default: f64,
    endpoint: String,
    min_interval_secs: u64,
    log: PathBuf,
) -> CliResult<()> {
    let api_key = std::env::var(API_KEY_ENV)
        .map_err(|_| format!("{} is not set; add it to the environment or .env", API_KEY_ENV))?;

    let directory = load_stop_directory(stops.as_ref())?;
    let series = build_series(&input, stop.as_deref(), bucket_minutes, &aggregator)?;
    let (forecast, model_name) = make_forecast(&series, horizon, period, fallback, fallback_window)?;

    let schedule = derive(
        &forecast,
        stop.as_deref(),
        peak_threshold,
        base_interval,
        peak_interval,
        load_penalty,
        load_threshold,
        symbol.as_deref(),
        load_default,
    );

    println!("Model: {}", model_name);
    print_schedule(&schedule, &directory);

    let sink = HttpOrderSink::new(&endpoint, &api_key).map_err(|e| e.to_string())?;
    println!(
        "Delivering {} entries to {} ({}s between attempts)...",
        schedule.len(),
        endpoint,
        min_interval_secs
    );

    let records = DeliveryPipeline::new(Duration::from_secs(min_interval_secs))
        .deliver(&schedule, &sink);

    let delivered = records.iter().filter(|r| r.outcome.is_success()).count();
    println!(
        "Delivered {}/{} entries ({} failed)",
        delivered,
        records.len(),
        records.len() - delivered
    );

    save_delivery_log(&records, &log).map_err(|e| format!("Failed to write log: {}", e))?;
    println!("Delivery log written to {:?}", log);

    Ok(())
}

fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Forecast {
            input,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            output,
        } => run_forecast(
            input,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            output,
        ),

        Commands::Schedule {
            input,
            stops,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            peak_threshold,
            base_interval,
            peak_interval,
            load_penalty,
            load_threshold,
            symbol,
            load_default,
            output,
        } => run_schedule(
            input,
            stops,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            peak_threshold,
            base_interval,
            peak_interval,
            load_penalty,
            load_threshold,
            symbol,
            load_default,
            output,
        ),

        Commands::Dispatch {
            input,
            stops,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            peak_threshold,
            base_interval,
            peak_interval,
            load_penalty,
            load_threshold,
            symbol,
            load_default,
            endpoint,
            min_interval_secs,
            log,
        } => run_dispatch(
            input,
            stops,
            stop,
            bucket_minutes,
            aggregator,
            horizon,
            period,
            fallback,
            fallback_window,
            peak_threshold,
            base_interval,
            peak_interval,
            load_penalty,
            load_threshold,
            symbol,
            load_default,
            endpoint,
            min_interval_secs,
            log,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
