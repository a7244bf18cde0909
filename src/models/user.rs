use crate::errors::{AppError, AppResult};
use crate::schema::*;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub created_at: i32,
    pub updated_at: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub created_at: i32,
    pub updated_at: i32,
    pub name: &'a str,
}

impl User {
    pub fn create(conn: &mut SqliteConnection, user_name: &str, now: i32) -> AppResult<User> {
        use crate::schema::users::dsl::users;

        if user_name.trim().is_empty() {
            return Err(AppError::Validation("user name must not be empty".to_string()));
        }
        let new_user = NewUser {
            created_at: now,
            updated_at: now,
            name: user_name,
        };
        diesel::insert_into(users)
            .values(&new_user)
            .get_result(conn)
            .map_err(|e| match AppError::from(e) {
                AppError::Duplicate(_) => AppError::Duplicate(format!("user {user_name}")),
                other => other,
            })
    }

    pub fn get_by_name(conn: &mut SqliteConnection, user_name: &str) -> AppResult<User> {
        use crate::schema::users::dsl::{name, users};

        users
            .filter(name.eq(user_name))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("user {user_name}")))
    }

    pub fn get_all(conn: &mut SqliteConnection) -> AppResult<Vec<User>> {
        use crate::schema::users::dsl::{name, users};

        users.order(name.asc()).load(conn).map_err(Into::into)
    }

    /// Removes every user; feeds, follows and posts cascade with them.
    pub fn delete_all(conn: &mut SqliteConnection) -> AppResult<usize> {
        use crate::schema::users::dsl::users;

        diesel::delete(users).execute(conn).map_err(Into::into)
    }
}
