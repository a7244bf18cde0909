use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diesel::SqliteConnection;
use reqwest::Client;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::{AppError, AppResult};
use crate::fetch;
use crate::ingest;
use crate::models::feed::Feed;
use crate::DbPool;

/// Upper bound on concurrent fetch slots; far below tokio's semaphore
/// permit limit and well past any sensible polling setup.
pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Time between ticks; each tick dispatches at most one feed.
    pub interval: Duration,
    /// Concurrent fetch slots. 1 degenerates to strictly sequential polling.
    pub workers: usize,
    pub fetch_timeout: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            interval: Duration::from_secs(60),
            workers: 1,
            fetch_timeout: fetch::DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Feeds currently in flight. Selection and claim happen under one lock so
/// two workers can never pick the same least-recently-fetched feed.
#[derive(Debug, Default)]
pub struct ClaimSet {
    claimed: Mutex<HashSet<i32>>,
}

impl ClaimSet {
    /// Atomically selects the next feed due for a fetch and claims it.
    /// `Ok(None)` when the store is empty or everything due is in flight.
    pub fn claim_next(&self, conn: &mut SqliteConnection) -> AppResult<Option<Feed>> {
        let mut claimed = self
            .claimed
            .lock()
            .map_err(|_| AppError::InvariantViolation("claim set lock poisoned".to_string()))?;
        let exclude: Vec<i32> = claimed.iter().copied().collect();
        let next = Feed::next_to_fetch(conn, &exclude)?;
        if let Some(feed) = &next {
            claimed.insert(feed.id);
        }
        Ok(next)
    }

    pub fn release(&self, feed_id: i32) {
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.remove(&feed_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.claimed.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// Parses `30s`, `5m`, `1h`, or a bare number of seconds.
pub fn parse_interval(raw: &str) -> AppResult<Duration> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.as_bytes().last().copied() {
        Some(b's') => (&raw[..raw.len() - 1], 1u64),
        Some(b'm') => (&raw[..raw.len() - 1], 60),
        Some(b'h') => (&raw[..raw.len() - 1], 3600),
        Some(b'0'..=b'9') => (raw, 1),
        _ => return Err(AppError::Validation(format!("invalid interval: {raw}"))),
    };
    let seconds: u64 = digits
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid interval: {raw}")))?;
    if seconds == 0 {
        return Err(AppError::Validation("interval must be positive".to_string()));
    }
    let seconds = seconds
        .checked_mul(multiplier)
        .ok_or_else(|| AppError::Validation(format!("interval too large: {raw}")))?;
    Ok(Duration::from_secs(seconds))
}

/// Polls feeds until Ctrl-C: on each tick, claim the least-recently-fetched
/// feed, fetch and reconcile it on a worker slot. Per-feed failures are
/// logged inside the worker and never stop the loop.
pub async fn run(pool: DbPool, options: SchedulerOptions) -> AppResult<()> {
    run_until(pool, options, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// The polling loop proper, running until `shutdown` resolves. The shutdown
/// signal is raced against tick-and-permit acquisition, so it is observed
/// even while every worker slot is busy.
pub async fn run_until<F>(pool: DbPool, options: SchedulerOptions, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    let workers = options.workers.clamp(1, MAX_WORKERS);
    let client = fetch::client();
    let claims = Arc::new(ClaimSet::default());
    let permits = Arc::new(Semaphore::new(workers));
    let mut ticker = tokio::time::interval(options.interval);
    tokio::pin!(shutdown);

    log::info!(
        "collecting feeds every {:?} with {workers} worker(s)",
        options.interval
    );

    loop {
        let dispatch = async {
            ticker.tick().await;
            Arc::clone(&permits).acquire_owned().await
        };
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("shutting down, letting in-flight fetches finish");
                break;
            }
            permit = dispatch => {
                let permit = permit.map_err(|_| {
                    AppError::InvariantViolation("worker semaphore closed".to_string())
                })?;
                spawn_worker(
                    pool.clone(),
                    client.clone(),
                    Arc::clone(&claims),
                    options.fetch_timeout,
                    permit,
                );
            }
        }
    }

    // Each in-flight fetch is bounded by its timeout; wait for all slots.
    let _ = permits.acquire_many(workers as u32).await;
    Ok(())
}

fn spawn_worker(
    pool: DbPool,
    client: Client,
    claims: Arc<ClaimSet>,
    timeout: Duration,
    permit: OwnedSemaphorePermit,
) {
    tokio::spawn(async move {
        let _permit = permit;
        fetch_and_apply(&pool, &client, &claims, timeout).await;
    });
}

/// One worker cycle: claim a feed, fetch it, apply the result, release the
/// claim. Returns the processed feed's id, or `None` when nothing was due.
/// Every failure is logged here; nothing propagates to the loop.
async fn fetch_and_apply(
    pool: &DbPool,
    client: &Client,
    claims: &ClaimSet,
    timeout: Duration,
) -> Option<i32> {
    // Hold the connection only while selecting, not across the fetch.
    let feed = {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("could not get store connection: {e}");
                return None;
            }
        };
        match claims.claim_next(&mut conn) {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                log::debug!("no feeds due for collection");
                return None;
            }
            Err(e) => {
                log::error!("could not pick next feed: {e}");
                return None;
            }
        }
    };

    let fetched = fetch::fetch_feed(client, &feed.url, timeout).await;
    let fetched_at = chrono::Utc::now().timestamp() as i32;

    match pool.get() {
        // The apply step logs its own failures; nothing propagates out of
        // the worker, so one unreachable feed never stops polling.
        Ok(mut conn) => {
            let _ = ingest::apply_fetch_result(&mut conn, &feed, fetched, fetched_at);
        }
        Err(e) => log::error!("could not get store connection: {e}"),
    }

    claims.release(feed.id);
    Some(feed.id)
}
