use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use super::fetcher::{fetch_payload, FetchError};
use super::normalize;
use super::parser::{parse_feed, ParseError};
use crate::storage::{Database, Feed, NewPost, StoreError};

/// Pipeline failure for a single feed cycle. Never escapes the scheduler
/// loop; every variant is logged and the loop goes back to idle.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Run one feed through the full pipeline: fetch, parse, normalize each
/// item, insert with duplicate suppression.
///
/// Returns the number of posts actually created. Items whose (feed, URL)
/// pair already exists are silently skipped and do not count; items without
/// a parseable date are stored with no timestamp. Insertion follows document
/// order.
pub async fn run_ingestion_cycle(
    db: &Database,
    client: &reqwest::Client,
    feed: &Feed,
) -> Result<usize, IngestError> {
    let payload = fetch_payload(client, &feed.url).await?;
    let parsed = parse_feed(&payload)?;
    tracing::debug!(
        feed = %feed.url,
        channel = %parsed.title,
        items = parsed.items.len(),
        "Parsed feed document"
    );

    let mut created = 0usize;
    for item in &parsed.items {
        let description = normalize::clean_description(&item.description);
        let post = NewPost {
            title: item.title.clone(),
            url: item.link.clone(),
            description: (!description.is_empty()).then_some(description),
            published_at: normalize::parse_published(&item.pub_date).map(|dt| dt.timestamp()),
        };

        match db.insert_post(feed.id, &post).await {
            Ok(_) => created += 1,
            // Already present: the expected steady state, not an error
            Err(StoreError::DuplicatePost) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        feed = %feed.name,
        items = parsed.items.len(),
        created = created,
        "Feed collected"
    );
    Ok(created)
}

/// One scheduler tick: pick the least-recently-fetched feed and run it
/// through the pipeline.
///
/// `last_fetched_at` is stamped *before* the fetch is attempted so a slow or
/// broken feed rotates to the back of the queue instead of monopolizing the
/// scheduler.
pub async fn run_scheduled_cycle(
    db: &Database,
    client: &reqwest::Client,
) -> Result<usize, IngestError> {
    let Some(feed) = db.next_feed_to_fetch().await.map_err(IngestError::Store)? else {
        tracing::debug!("No feeds subscribed, nothing to fetch");
        return Ok(0);
    };

    db.mark_feed_fetched(feed.id).await.map_err(IngestError::Store)?;
    run_ingestion_cycle(db, client, &feed).await
}

/// Run the scheduler until the process is terminated.
///
/// A fixed-interval timer drives one cycle per tick, strictly sequentially:
/// the next tick is not awaited until the in-flight cycle (network included)
/// has finished. Per-feed failures are logged and never stop the loop.
pub async fn run_scheduler(db: &Database, client: &reqwest::Client, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Collecting feeds");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = run_scheduled_cycle(db, client).await {
            tracing::warn!(error = %e, "Feed cycle failed");
        }
    }
}
