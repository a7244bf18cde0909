use super::feed::Feed;
use super::user::User;
use crate::errors::{AppError, AppResult};
use crate::schema::*;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Feed))]
#[diesel(table_name = feed_follows)]
pub struct FeedFollow {
    pub id: i32,
    pub created_at: i32,
    pub user_id: i32,
    pub feed_id: i32,
}

#[derive(Debug, Serialize, Deserialize, Insertable)]
#[diesel(table_name = feed_follows)]
pub struct NewFeedFollow {
    pub created_at: i32,
    pub user_id: i32,
    pub feed_id: i32,
}

impl FeedFollow {
    pub fn create(
        conn: &mut SqliteConnection,
        follower_id: i32,
        followed_feed_id: i32,
        now: i32,
    ) -> AppResult<FeedFollow> {
        use crate::schema::feed_follows::dsl::feed_follows;

        let new_follow = NewFeedFollow {
            created_at: now,
            user_id: follower_id,
            feed_id: followed_feed_id,
        };
        diesel::insert_into(feed_follows)
            .values(&new_follow)
            .get_result(conn)
            .map_err(|e| match AppError::from(e) {
                AppError::Duplicate(_) => AppError::Duplicate("follow".to_string()),
                other => other,
            })
    }

    pub fn delete(
        conn: &mut SqliteConnection,
        follower_id: i32,
        followed_feed_id: i32,
    ) -> AppResult<()> {
        use crate::schema::feed_follows::dsl::{feed_follows, feed_id, user_id};

        let removed = diesel::delete(
            feed_follows
                .filter(user_id.eq(follower_id))
                .filter(feed_id.eq(followed_feed_id)),
        )
        .execute(conn)?;
        if removed == 0 {
            return Err(AppError::NotFound("follow".to_string()));
        }
        Ok(())
    }

    /// Feeds the user follows, ordered by feed name.
    pub fn feeds_for_user(conn: &mut SqliteConnection, follower_id: i32) -> AppResult<Vec<Feed>> {
        feed_follows::table
            .inner_join(feeds::table)
            .filter(feed_follows::user_id.eq(follower_id))
            .select(feeds::all_columns)
            .order(feeds::name.asc())
            .load(conn)
            .map_err(Into::into)
    }
}
