//! # hn_pulse
//!
//! Harvests the Hacker News `/newest` page, enriches every story with the
//! paragraph text of the page it links to, stores the batch, and pushes it to
//! connected WebSocket subscribers.
//!
//! ## Usage
//!
//! ```sh
//! hn_pulse serve --port 3000 --interval-secs 3600
//! hn_pulse scrape -j ./out -c ./out
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: fetch the listing page and extract story rows
//! 2. **Fan-out**: fetch every story's page concurrently, each with a deadline
//! 3. **Aggregate**: once every fetch has settled, assemble the batch in listing order
//! 4. **Persist & publish**: store the batch, broadcast it to every subscriber
//!
//! New subscribers get a recent-activity count and a batch of their own on
//! connect, independent of the schedule.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod aggregate;
mod cli;
mod error;
mod fetch;
mod handshake;
mod hub;
mod models;
mod outputs;
mod pipeline;
mod scheduler;
mod scrapers;
mod server;
mod store;
mod utils;

use aggregate::AggregateOptions;
use cli::{Cli, Command, HarvestArgs, ScrapeArgs, ServeArgs};
use fetch::HttpFetcher;
use hub::SubscriberHub;
use pipeline::Harvest;
use scheduler::Scheduler;
use server::AppState;
use store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Serve(args) => serve(args).await,
        Command::Scrape(args) => scrape(args).await,
    }
}

fn build_harvest(args: &HarvestArgs) -> Result<(HttpFetcher, Harvest), Box<dyn Error>> {
    let deadline = Duration::from_secs(args.fetch_timeout_secs);
    let fetcher = HttpFetcher::new(deadline)?;
    let harvest = Harvest {
        listing_url: Url::parse(&args.listing_url)?,
        options: AggregateOptions {
            deadline,
            max_in_flight: args.max_in_flight,
        },
    };
    Ok((fetcher, harvest))
}

#[instrument(level = "info", skip_all)]
async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let (fetcher, harvest) = build_harvest(&args.harvest)?;

    let store = match SqliteStore::connect(&args.database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(database_url = %args.database_url, error = %e, "Database initialization error");
            return Err(e.into());
        }
    };
    let fetcher = Arc::new(fetcher);
    let hub = SubscriberHub::new();

    let scheduler = Scheduler::new(
        fetcher.clone(),
        store.clone(),
        Arc::new(hub.clone()),
        harvest.clone(),
        Duration::from_secs(args.interval_secs),
    )
    .spawn();

    let state = Arc::new(AppState {
        fetcher,
        store,
        hub,
        harvest,
        recent_window: Duration::from_secs(args.recent_window_secs),
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Server running");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    scheduler.abort();
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn scrape(args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let (fetcher, harvest) = build_harvest(&args.harvest)?;

    let batch = harvest.run(&fetcher).await?;
    let json_path = outputs::json::write_batch(&batch, &args.json_output_dir).await?;
    let csv_path = outputs::csv::write_batch(&batch, &args.csv_output_dir).await?;

    let elapsed = start_time.elapsed();
    info!(
        json = %json_path.display(),
        csv = %csv_path.display(),
        total = batch.len(),
        enriched = batch.enriched_count(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Scraping complete"
    );
    Ok(())
}
