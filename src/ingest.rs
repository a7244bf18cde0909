use diesel::SqliteConnection;

use crate::errors::AppResult;
use crate::fetch::ParsedFeed;
use crate::models::feed::Feed;
use crate::models::post::NewPost;

/// Outcome of reconciling one fetched document. Observability only: a
/// zero-new-item pass is a perfectly normal result.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ReconcileSummary {
    pub items_added: usize,
    pub items_seen: usize,
}

/// Persists the items of `parsed` that have not been seen before, then
/// advances the feed's last-fetched timestamp.
///
/// Items are processed in source order. Already-present links are skipped
/// silently; a malformed item is logged and skipped without aborting the
/// pass. `mark_fetched` runs exactly once, after the item loop, so a crash
/// mid-pass leaves the feed first in line for re-fetch instead of parked
/// for a full interval.
pub fn reconcile(
    conn: &mut SqliteConnection,
    feed: &Feed,
    parsed: &ParsedFeed,
    fetched_at: i32,
) -> AppResult<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();

    for item in &parsed.items {
        summary.items_seen += 1;
        let post = NewPost {
            created_at: fetched_at,
            feed_id: feed.id,
            title: &item.title,
            url: &item.link,
            published_at: item.published_at.unwrap_or(fetched_at),
            description: item.description.as_deref(),
        };
        match post.insert_if_not_present(conn) {
            Ok(true) => summary.items_added += 1,
            Ok(false) => log::debug!("post already recorded: {}", item.link),
            Err(e) => log::warn!("could not record post {} for feed {}: {e}", item.link, feed.url),
        }
    }

    Feed::mark_fetched(conn, feed.id, fetched_at)?;
    Ok(summary)
}

/// Per-feed isolation boundary for the scheduler: a failed fetch is logged
/// with the feed's identity and leaves `last_fetched_at` untouched, so the
/// feed keeps its place in the polling order.
pub fn apply_fetch_result(
    conn: &mut SqliteConnection,
    feed: &Feed,
    fetched: AppResult<ParsedFeed>,
    fetched_at: i32,
) -> AppResult<ReconcileSummary> {
    match fetched {
        Ok(parsed) => {
            let summary = reconcile(conn, feed, &parsed, fetched_at)?;
            log::info!(
                "feed {}: {} new of {} items",
                feed.url,
                summary.items_added,
                summary.items_seen
            );
            Ok(summary)
        }
        Err(e) => {
            log::warn!("fetch failed for feed {} ({}): {e}", feed.name, feed.url);
            Err(e)
        }
    }
}
