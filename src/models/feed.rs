use super::user::User;
use crate::errors::{AppError, AppResult};
use crate::schema::*;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Associations, PartialEq, Clone)]
#[diesel(belongs_to(User))]
#[diesel(table_name = feeds)]
pub struct Feed {
    pub id: i32,
    pub created_at: i32,
    pub updated_at: i32,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub user_id: i32,
    /// None until the first successful fetch; never-fetched feeds have
    /// absolute priority in `next_to_fetch`.
    pub last_fetched_at: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Insertable)]
#[diesel(table_name = feeds)]
pub struct NewFeed<'a> {
    pub created_at: i32,
    pub updated_at: i32,
    pub name: &'a str,
    pub url: &'a str,
    pub description: Option<&'a str>,
    pub user_id: i32,
}

impl<'a> NewFeed<'a> {
    pub fn insert(&self, conn: &mut SqliteConnection) -> AppResult<Feed> {
        use crate::schema::feeds::dsl::feeds;

        if self.name.trim().is_empty() {
            return Err(AppError::Validation("feed name must not be empty".to_string()));
        }
        diesel::insert_into(feeds)
            .values(self)
            .get_result(conn)
            .map_err(|e| match AppError::from(e) {
                AppError::Duplicate(_) => AppError::Duplicate(format!("feed url {}", self.url)),
                other => other,
            })
    }
}

impl Feed {
    pub fn get_by_url(conn: &mut SqliteConnection, feed_url: &str) -> AppResult<Feed> {
        use crate::schema::feeds::dsl::{feeds, url};

        feeds
            .filter(url.eq(feed_url))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("feed {feed_url}")))
    }

    pub fn get_all(conn: &mut SqliteConnection) -> AppResult<Vec<Feed>> {
        use crate::schema::feeds::dsl::feeds;

        feeds.load(conn).map_err(Into::into)
    }

    /// All feeds paired with the name of the user who added them.
    pub fn get_all_with_owners(conn: &mut SqliteConnection) -> AppResult<Vec<(Feed, String)>> {
        feeds::table
            .inner_join(users::table)
            .select((feeds::all_columns, users::name))
            .order(feeds::name.asc())
            .load(conn)
            .map_err(Into::into)
    }

    /// The feed whose `last_fetched_at` is earliest, skipping ids in
    /// `exclude` (feeds already claimed by another worker). SQLite sorts
    /// NULLs first under ascending order, so never-fetched feeds always win.
    /// `Ok(None)` when every feed is excluded or none exist.
    pub fn next_to_fetch(conn: &mut SqliteConnection, exclude: &[i32]) -> AppResult<Option<Feed>> {
        use crate::schema::feeds::dsl::{feeds, id, last_fetched_at};

        feeds
            .filter(id.ne_all(exclude))
            .order(last_fetched_at.asc())
            .then_order_by(id.asc())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    /// Advances the feed's last-fetched timestamp. Called exactly once per
    /// successful fetch, after item reconciliation.
    pub fn mark_fetched(conn: &mut SqliteConnection, feed_id: i32, ts: i32) -> AppResult<()> {
        use crate::schema::feeds::dsl::{feeds, id, last_fetched_at, updated_at};

        let updated = diesel::update(feeds.filter(id.eq(feed_id)))
            .set((last_fetched_at.eq(Some(ts)), updated_at.eq(ts)))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::InvariantViolation(format!(
                "feed {feed_id} vanished before mark_fetched"
            )));
        }
        Ok(())
    }
}
