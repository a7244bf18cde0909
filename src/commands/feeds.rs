use chrono::Utc;
use diesel::SqliteConnection;
use url::Url;

use super::{require_user, AppState, Command};
use crate::errors::{AppError, AppResult};
use crate::fetch::{self, ParsedFeed};
use crate::models::feed::{Feed, NewFeed};
use crate::models::follow::FeedFollow;
use crate::models::post::Post;
use crate::models::user::User;

/// Adds a new feed for the logged-in user and follows it.
///
/// The remote document must be reachable and carry a channel title before
/// anything is committed, so a typo'd URL or a non-feed page never lands in
/// the store.
pub fn addfeed(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    const USAGE: &str = "addfeed <name> <url>";
    let name = cmd.arg(0, USAGE)?.to_string();
    let feed_url = cmd.arg(1, USAGE)?.to_string();
    Url::parse(&feed_url)
        .map_err(|e| AppError::Validation(format!("invalid feed url {feed_url}: {e}")))?;
    let user = require_user(state)?;

    let document = fetch_once(&feed_url);

    let mut conn = state.conn()?;
    let feed = create_feed_from_document(
        &mut conn,
        &user,
        &name,
        &feed_url,
        document,
        Utc::now().timestamp() as i32,
    )?;
    println!("Saved \"{}\" ({}) for {}", feed.name, feed.url, user.name);
    println!("{} followed {}", user.name, feed.name);
    Ok(())
}

/// The store side of `addfeed`, split from the network fetch: commits the
/// feed row and the owner's follow only if the document came back valid.
pub fn create_feed_from_document(
    conn: &mut SqliteConnection,
    user: &User,
    name: &str,
    feed_url: &str,
    document: AppResult<ParsedFeed>,
    now: i32,
) -> AppResult<Feed> {
    let parsed = document?;
    let new_feed = NewFeed {
        created_at: now,
        updated_at: now,
        name,
        url: feed_url,
        description: parsed.description.as_deref(),
        user_id: user.id,
    };
    let feed = new_feed.insert(conn)?;
    FeedFollow::create(conn, user.id, feed.id, now)?;
    Ok(feed)
}

/// Lists all feeds from all users.
pub fn feeds(state: &mut AppState, _cmd: &Command) -> AppResult<()> {
    let mut conn = state.conn()?;
    for (feed, owner) in Feed::get_all_with_owners(&mut conn)? {
        println!("* {} ({}) - added by {owner}", feed.name, feed.url);
    }
    Ok(())
}

/// Follows an already-added feed by URL.
pub fn follow(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    let feed_url = cmd.arg(0, "follow <url>")?;
    let user = require_user(state)?;
    let mut conn = state.conn()?;
    let feed = Feed::get_by_url(&mut conn, feed_url)?;
    FeedFollow::create(&mut conn, user.id, feed.id, Utc::now().timestamp() as i32)?;
    println!("{} followed {}", user.name, feed.name);
    Ok(())
}

pub fn unfollow(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    let feed_url = cmd.arg(0, "unfollow <url>")?;
    let user = require_user(state)?;
    let mut conn = state.conn()?;
    let feed = Feed::get_by_url(&mut conn, feed_url)?;
    FeedFollow::delete(&mut conn, user.id, feed.id)?;
    println!("{} unfollowed {}", user.name, feed.name);
    Ok(())
}

/// Lists the feeds the logged-in user follows.
pub fn following(state: &mut AppState, _cmd: &Command) -> AppResult<()> {
    let user = require_user(state)?;
    let mut conn = state.conn()?;
    for feed in FeedFollow::feeds_for_user(&mut conn, user.id)? {
        println!("* {}", feed.name);
    }
    Ok(())
}

/// Shows the newest posts across the feeds the user follows.
pub fn browse(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    let limit: i64 = match cmd.args.first() {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid limit: {raw}")))?,
        None => 2,
    };
    // SQLite reads a negative LIMIT as "unlimited"; reject it up front.
    if limit <= 0 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }
    let user = require_user(state)?;
    let mut conn = state.conn()?;
    for (post, feed_name) in Post::recent_for_user(&mut conn, user.id, limit)? {
        println!("{} ({feed_name})", post.title);
        println!("  {}", post.url);
        if let Some(description) = &post.description {
            println!("  {description}");
        }
    }
    Ok(())
}

/// One blocking fetch for feed creation; the scheduler owns its own runtime,
/// this path just needs a single request.
fn fetch_once(feed_url: &str) -> AppResult<ParsedFeed> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fetch::fetch_feed(
        &fetch::client(),
        feed_url,
        fetch::DEFAULT_FETCH_TIMEOUT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetch::ParsedItem;
    use crate::test_helpers::{get_test_db_connection, get_test_db_pool, seed_user};

    fn sample_document() -> ParsedFeed {
        ParsedFeed {
            title: "Example Blog".to_string(),
            description: Some("posts".to_string()),
            items: vec![ParsedItem {
                title: "one".to_string(),
                link: "http://example.com/1".to_string(),
                published_at: None,
                description: None,
            }],
        }
    }

    #[test]
    fn test_create_feed_commits_row_and_follow() {
        let mut conn = get_test_db_connection();
        let user = seed_user(&mut conn, "alice");

        let feed = create_feed_from_document(
            &mut conn,
            &user,
            "Example",
            "http://example.com/rss",
            Ok(sample_document()),
            100,
        )
        .unwrap();
        assert_eq!(feed.description.as_deref(), Some("posts"));
        assert_eq!(
            FeedFollow::feeds_for_user(&mut conn, user.id).unwrap(),
            vec![feed]
        );
    }

    #[test]
    fn test_invalid_document_creates_no_row() {
        let mut conn = get_test_db_connection();
        let user = seed_user(&mut conn, "alice");

        let err = create_feed_from_document(
            &mut conn,
            &user,
            "Example",
            "http://example.com/rss",
            Err(AppError::Validation("feed document has no channel title".to_string())),
            100,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(Feed::get_all(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_document_creates_no_row() {
        let mut conn = get_test_db_connection();
        let user = seed_user(&mut conn, "alice");

        let err = create_feed_from_document(
            &mut conn,
            &user,
            "Example",
            "http://example.com/rss",
            Err(AppError::Fetch("connection refused".to_string())),
            100,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
        assert!(Feed::get_all(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_browse_rejects_non_positive_limit() {
        let pool = get_test_db_pool();
        {
            let mut conn = pool.get().unwrap();
            seed_user(&mut conn, "alice");
        }
        let mut state = AppState {
            config: Config {
                db_url: ":memory:".to_string(),
                current_user_name: Some("alice".to_string()),
            },
            pool,
        };
        for raw in ["0", "-5"] {
            let cmd = Command {
                name: "browse".to_string(),
                args: vec![raw.to_string()],
            };
            let err = browse(&mut state, &cmd).unwrap_err();
            assert!(
                matches!(err, AppError::Validation(_)),
                "expected rejection for {raw:?}"
            );
        }
    }

    #[test]
    fn test_duplicate_url_rejected_on_add() {
        let mut conn = get_test_db_connection();
        let user = seed_user(&mut conn, "alice");

        create_feed_from_document(
            &mut conn,
            &user,
            "Example",
            "http://example.com/rss",
            Ok(sample_document()),
            100,
        )
        .unwrap();
        let err = create_feed_from_document(
            &mut conn,
            &user,
            "Example again",
            "http://example.com/rss",
            Ok(sample_document()),
            200,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }
}
