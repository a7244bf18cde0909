use super::feed::Feed;
use crate::errors::AppResult;
use crate::schema::*;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(Feed))]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub created_at: i32,
    pub feed_id: i32,
    pub title: String,
    pub url: String,
    pub published_at: i32,
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub created_at: i32,
    pub feed_id: i32,
    pub title: &'a str,
    pub url: &'a str,
    pub published_at: i32,
    pub description: Option<&'a str>,
}

impl<'a> NewPost<'a> {
    /// Inserts the post unless one with the same (feed_id, url) exists.
    /// Re-fetching a feed hits the duplicate case constantly; it is not an
    /// error, so the unique constraint resolves the race between check and
    /// insert. Returns whether a row was actually written.
    pub fn insert_if_not_present(&self, conn: &mut SqliteConnection) -> AppResult<bool> {
        use crate::schema::posts::dsl::posts;

        let inserted = diesel::insert_into(posts)
            .values(self)
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(inserted > 0)
    }
}

impl Post {
    pub fn get_by_feed(conn: &mut SqliteConnection, owner_feed_id: i32) -> AppResult<Vec<Post>> {
        use crate::schema::posts::dsl::{feed_id, posts};

        posts
            .filter(feed_id.eq(owner_feed_id))
            .load(conn)
            .map_err(Into::into)
    }

    pub fn count_for_feed(conn: &mut SqliteConnection, owner_feed_id: i32) -> AppResult<i64> {
        use crate::schema::posts::dsl::{feed_id, posts};

        posts
            .filter(feed_id.eq(owner_feed_id))
            .count()
            .get_result(conn)
            .map_err(Into::into)
    }

    /// Newest posts across the feeds a user follows, paired with the feed
    /// name for display.
    pub fn recent_for_user(
        conn: &mut SqliteConnection,
        follower_id: i32,
        limit: i64,
    ) -> AppResult<Vec<(Post, String)>> {
        posts::table
            .inner_join(feeds::table.inner_join(feed_follows::table))
            .filter(feed_follows::user_id.eq(follower_id))
            .order(posts::published_at.desc())
            .limit(limit)
            .select((posts::all_columns, feeds::name))
            .load(conn)
            .map_err(Into::into)
    }
}
