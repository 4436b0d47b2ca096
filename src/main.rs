//! Fare Routing Validation CLI
//!
//! # Overview
//!
//! ```text
//!   config.toml ──▶ config::load_config ──▶ FareRoutingConfig
//!                                                │
//!   data.json ────▶ InMemoryDataHandle ──────────┤
//!                                                ▼
//!   markets.json ─▶ FareMarket[] ──▶ RoutingController (one per run)
//!                                      │  one blocking task per market
//!                                      ▼
//!                                 MarketResult[] ──▶ JSON on stdout
//! ```
//!
//! Logs go to stderr. `--print-metrics` appends the Prometheus rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;

use fare_routing::config::{load_config, FareRoutingConfig};
use fare_routing::controller::MarketResult;
use fare_routing::fare::FareMarket;
use fare_routing::observability::{logging, metrics};
use fare_routing::{InMemoryDataHandle, PricingContext, RoutingController};

#[derive(Parser)]
#[command(name = "fare-routing")]
#[command(about = "Validate airline fare routings against filed maps and restrictions", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the fares of every fare market
    Validate {
        /// JSON data snapshot (routings, preferences, mileage, local markets)
        #[arg(short, long)]
        data: PathBuf,

        /// JSON list of fare markets to validate
        #[arg(short, long)]
        markets: PathBuf,

        /// Travel date (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print Prometheus metrics after the results
        #[arg(long)]
        print_metrics: bool,
    },
    /// Load and validate the configuration only
    CheckConfig,
}

fn load(path: Option<&Path>) -> Result<FareRoutingConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(FareRoutingConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(cli.config.as_deref())?;
    logging::init_logging(&config.observability.log_filter);

    match cli.command {
        Commands::CheckConfig => {
            tracing::info!(
                drv_enabled = config.validation.drv_enabled,
                rtw = config.validation.rtw,
                graph_capacity = config.cache.graph_capacity,
                max_surcharge_pct = config.mileage.max_surcharge_pct,
                "Configuration valid"
            );
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Validate {
            data,
            markets,
            date,
            print_metrics,
        } => {
            let recorder = if config.observability.metrics_enabled || print_metrics {
                Some(metrics::init_metrics()?)
            } else {
                None
            };

            let handle = InMemoryDataHandle::from_json(&tokio::fs::read_to_string(&data).await?)?;
            let markets: Vec<FareMarket> = serde_json::from_str(&tokio::fs::read_to_string(&markets).await?)?;
            let travel_date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let ctx = PricingContext::new(travel_date).with_rtw(config.validation.rtw);

            tracing::info!(
                transaction = %ctx.id,
                markets = markets.len(),
                %travel_date,
                "Validating fare markets"
            );

            let controller = Arc::new(RoutingController::new(Arc::new(handle), &config, ctx));
            let results = run(controller, markets).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);

            if let Some(recorder) = recorder {
                println!("{}", recorder.render());
            }
        }
    }
    Ok(())
}

/// Validate markets concurrently, returning results in input order.
async fn run(
    controller: Arc<RoutingController>,
    markets: Vec<FareMarket>,
) -> Result<Vec<MarketResult>, tokio::task::JoinError> {
    let mut tasks = JoinSet::new();
    for (i, market) in markets.into_iter().enumerate() {
        let controller = controller.clone();
        tasks.spawn_blocking(move || (i, controller.process(&market)));
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(i, _)| *i);
    Ok(results.into_iter().map(|(_, r)| r).collect())
}
