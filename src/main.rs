use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use creel::config::{parse_interval, Config};
use creel::ingest;
use creel::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "creel", about = "RSS/Atom feed aggregation daemon")]
struct Cli {
    /// Path to the SQLite database (defaults to ~/.config/creel/creel.db)
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe a feed
    Add {
        /// Display name for the feed
        name: String,
        /// Feed URL
        url: String,
        /// Opaque owner reference to record on the feed
        #[arg(long)]
        user: Option<String>,
    },
    /// List subscribed feeds
    Feeds,
    /// List recent posts across all feeds
    Posts {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Fetch one feed immediately, bypassing the scheduler timer
    Fetch {
        /// URL of a subscribed feed
        url: String,
    },
    /// Run the scheduler until killed
    Run {
        /// Fetch interval: seconds or an s/m/h suffix (90, 30s, 5m, 1h)
        interval: String,
    },
}

/// Get the config directory path (~/.config/creel/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("creel"))
}

fn format_timestamp(ts: Option<i64>) -> String {
    match ts.and_then(|t| Utc.timestamp_opt(t, 0).single()) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Any found-to-be-invalid startup input (interval, config, store) is
    // fatal here; once running, per-feed errors never are.
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }
    let config = Config::load(&config_dir.join("config.toml"))?;

    let db_path = cli
        .database
        .or_else(|| config.database_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config_dir.join("creel.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    match cli.command {
        Command::Add { name, url, user } => {
            let id = db
                .insert_feed(&name, &url, user.as_deref())
                .await
                .context("Couldn't create feed")?;
            println!("Subscribed feed {} ({})", name, id);
        }
        Command::Feeds => {
            let feeds = db.list_feeds().await?;
            if feeds.is_empty() {
                println!("No feeds subscribed.");
            }
            for feed in feeds {
                println!(
                    "{:>4}  {}  {}  last fetched: {}",
                    feed.id,
                    feed.name,
                    feed.url,
                    format_timestamp(feed.last_fetched_at)
                );
            }
        }
        Command::Posts { limit } => {
            for post in db.recent_posts(limit).await? {
                println!(
                    "{}  {}\n      {}",
                    format_timestamp(post.published_at),
                    post.title,
                    post.url
                );
                if let Some(description) = &post.description {
                    println!("      {}", description);
                }
            }
        }
        Command::Fetch { url } => {
            let Some(feed) = db.feed_by_url(&url).await? else {
                bail!("No subscribed feed with URL {}", url);
            };
            let client = ingest::build_client(&config.user_agent)
                .context("Failed to build HTTP client")?;
            db.mark_feed_fetched(feed.id).await?;
            let created = ingest::run_ingestion_cycle(&db, &client, &feed)
                .await
                .with_context(|| format!("Couldn't collect feed {}", feed.name))?;
            println!("Feed {} collected, {} new posts", feed.name, created);
        }
        Command::Run { interval } => {
            let interval = parse_interval(&interval)?;
            let client = ingest::build_client(&config.user_agent)
                .context("Failed to build HTTP client")?;
            ingest::run_scheduler(&db, &client, interval).await;
        }
    }

    Ok(())
}
