//! CLI commands for events-api.
//!
//! Runs the API server or a one-off scrape of the events page.

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::retry::{retry, RetryConfig};
use crate::scraper::classify::partition;
use crate::scraper::{browser_source, Clock, EventSource, SystemClock};
use crate::types::{Event, EventsResult};

#[derive(Parser)]
#[command(name = "events-api")]
#[command(version, about = "Club events feed: scraper and cached API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scrape the events page once and print the result
    Fetch {
        /// Output format (json, table)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Retries after a failed scrape
        #[arg(short, long, default_value_t = 2)]
        retries: u32,
    },
}

/// Scrape once, bypassing the cache.
pub async fn run_fetch(format: String, retries: u32) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let source = browser_source(&config.source)?;

    eprintln!("Fetching events from: {}", config.source.url);
    let retry_config = RetryConfig::browser().with_max_retries(retries);
    let events = retry(&retry_config, "Events scrape", || source.fetch_events()).await?;
    eprintln!("Extracted {} events", events.len());

    let result = partition(events, SystemClock.current_year());

    match format.as_str() {
        "table" => print_table(&result),
        _ => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

/// Print events in table format.
fn print_table(result: &EventsResult) {
    print_section("Upcoming", &result.upcoming_events);
    print_section("Past", &result.past_events);
}

fn print_section(heading: &str, events: &[Event]) {
    println!("=== {} ({}) ===", heading, events.len());
    for event in events {
        println!(
            "  {:>8}  {:<40}  {:<28}  {}",
            event.id, event.title, event.date, event.price
        );
    }
    println!();
}
