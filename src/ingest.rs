//! The ingestion pipeline: one feed, end to end.
//!
//! Each cycle claims the least-recently-fetched feed (stamping it fetched
//! before the network call, so a broken feed cannot monopolize the rotation),
//! fetches and decodes its document, normalizes item dates, and writes posts.
//! Item-level problems are counted and logged; only selector and fetch
//! failures abort a cycle.

use thiserror::Error;

use crate::feed::{normalize, FetchError, Fetcher};
use crate::storage::{Database, DatabaseError, NewPost};

/// Errors that abort one ingestion cycle. All of them are recoverable at the
/// next tick.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The feed set is empty; nothing to poll.
    #[error("no feeds registered")]
    NoFeedsRegistered,

    /// The claimed feed could not be fetched or decoded. Its fetched stamp
    /// stands, so the rotation moves on.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Claiming the feed failed at the database.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// What one cycle did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub feed_id: i64,
    pub feed_name: String,
    pub items_seen: usize,
    pub posts_inserted: usize,
    pub duplicates_skipped: usize,
    pub missing_links: usize,
    pub date_parse_failures: usize,
    pub persist_failures: usize,
}

/// Run one ingestion cycle: claim the due feed, fetch it, store its items.
pub async fn run_cycle(db: &Database, fetcher: &Fetcher) -> Result<CycleSummary, IngestError> {
    let now = chrono::Utc::now().timestamp();
    let feed = db
        .claim_due_feed(now)
        .await?
        .ok_or(IngestError::NoFeedsRegistered)?;

    tracing::debug!(feed = %feed.url, "Fetching feed");
    let channel = fetcher.fetch(&feed.url).await?;

    let mut summary = CycleSummary {
        feed_id: feed.id,
        feed_name: feed.name.clone(),
        items_seen: channel.items.len(),
        ..CycleSummary::default()
    };

    for item in &channel.items {
        if item.link.is_empty() {
            summary.missing_links += 1;
            tracing::warn!(feed = %feed.url, title = %item.title, "Skipping item without link");
            continue;
        }

        let published_at = match normalize::parse_pub_date(&item.pub_date) {
            Ok(parsed) => parsed.map(|dt| dt.timestamp()),
            Err(e) => {
                summary.date_parse_failures += 1;
                tracing::warn!(
                    feed = %feed.url,
                    link = %item.link,
                    error = %e,
                    "Unrecognized publication date, storing post without one"
                );
                None
            }
        };

        let post = NewPost {
            title: non_empty(&item.title),
            link: item.link.clone(),
            description: non_empty(&item.description),
            published_at,
        };

        match db.insert_post(feed.id, &post).await {
            Ok(true) => summary.posts_inserted += 1,
            Ok(false) => summary.duplicates_skipped += 1,
            Err(e) => {
                summary.persist_failures += 1;
                tracing::warn!(feed = %feed.url, link = %post.link, error = %e, "Failed to store post");
            }
        }
    }

    tracing::info!(
        feed = %feed.name,
        items = summary.items_seen,
        inserted = summary.posts_inserted,
        duplicates = summary.duplicates_skipped,
        "Ingestion cycle complete"
    );

    Ok(summary)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}
