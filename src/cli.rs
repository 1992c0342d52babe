//! Command-line interface definitions.
//!
//! Every option can also be supplied through the environment variable named
//! next to it.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for hn_pulse.
///
/// # Examples
///
/// ```sh
/// # Serve live subscribers, harvesting every ten minutes
/// hn_pulse serve --interval-secs 600
///
/// # Harvest once and write ./out/hackernews_articles.{json,csv}
/// hn_pulse scrape -j ./out -c ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest on a schedule and push batches to WebSocket subscribers
    Serve(ServeArgs),
    /// Harvest once and write the batch as JSON and CSV
    Scrape(ScrapeArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// Listing page to harvest
    #[arg(long, env = "LISTING_URL", default_value = crate::scrapers::hackernews::LISTING_URL)]
    pub listing_url: String,

    /// Deadline for each page fetch, in seconds
    #[arg(
        long,
        env = "FETCH_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub fetch_timeout_secs: u64,

    /// Cap on concurrent article fetches (unlimited when unset)
    #[arg(long, env = "MAX_IN_FLIGHT", value_parser = clap::value_parser!(usize))]
    pub max_in_flight: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://hn_pulse.db?mode=rwc")]
    pub database_url: String,

    /// Seconds between scheduled harvests
    #[arg(
        long,
        env = "SCRAPE_INTERVAL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: u64,

    /// Trailing window, in seconds, for the recent-activity count
    #[arg(long, env = "RECENT_WINDOW_SECS", default_value_t = 3600)]
    pub recent_window_secs: u64,

    #[command(flatten)]
    pub harvest: HarvestArgs,
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Output directory for the JSON file
    #[arg(short, long, env = "JSON_OUTPUT_DIR", default_value = ".")]
    pub json_output_dir: String,

    /// Output directory for the CSV file
    #[arg(short, long, env = "CSV_OUTPUT_DIR", default_value = ".")]
    pub csv_output_dir: String,

    #[command(flatten)]
    pub harvest: HarvestArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["hn_pulse", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 3000);
        assert_eq!(args.interval_secs, 3600);
        assert_eq!(args.recent_window_secs, 3600);
        assert_eq!(args.harvest.listing_url, "https://news.ycombinator.com/newest");
        assert_eq!(args.harvest.fetch_timeout_secs, 10);
        assert_eq!(args.harvest.max_in_flight, None);
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from([
            "hn_pulse",
            "serve",
            "-p",
            "8080",
            "--interval-secs",
            "1",
            "--recent-window-secs",
            "300",
            "--max-in-flight",
            "8",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.interval_secs, 1);
        assert_eq!(args.recent_window_secs, 300);
        assert_eq!(args.harvest.max_in_flight, Some(8));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["hn_pulse", "serve", "--interval-secs", "0"]).is_err());
    }

    #[test]
    fn test_scrape_short_flag() {
        let cli = Cli::parse_from(["hn_pulse", "scrape", "-j", "/tmp/json", "-c", "/tmp/csv"]);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.json_output_dir, "/tmp/json");
        assert_eq!(args.csv_output_dir, "/tmp/csv");
    }

    #[test]
    fn test_scrape_defaults_to_current_dir() {
        let cli = Cli::parse_from(["hn_pulse", "scrape"]);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.json_output_dir, ".");
        assert_eq!(args.csv_output_dir, ".");
    }
}
