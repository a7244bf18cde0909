//! Test support: in-memory databases with the schema applied, seed helpers,
//! and one-shot local HTTP servers for fetch tests. Compiled unconditionally
//! so the `tests/` directory can use it.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;

use crate::models::feed::{Feed, NewFeed};
use crate::models::user::User;
use crate::{DbPool, MIGRATIONS};

/// In-memory SQLite connection with migrations applied.
pub fn get_test_db_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .unwrap_or_else(|_| panic!("Error connecting to in-memory SQLite database"));
    prepare(&mut conn);
    conn
}

/// Single-connection pool over an in-memory database, for code paths that
/// take a `DbPool`. One connection means every checkout sees the same
/// database; callers must drop their connection before the code under test
/// asks for one.
pub fn get_test_db_pool() -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = diesel::r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to create pool");
    let mut conn = pool.get().expect("Failed to get connection");
    prepare(&mut conn);
    drop(conn);
    pool
}

fn prepare(conn: &mut SqliteConnection) {
    diesel::sql_query("PRAGMA foreign_keys = ON;")
        .execute(conn)
        .expect("Failed to enable foreign keys");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
}

pub fn seed_user(conn: &mut SqliteConnection, name: &str) -> User {
    User::create(conn, name, 1).expect("Failed to create user")
}

pub fn seed_feed(conn: &mut SqliteConnection, user_id: i32, url: &str) -> Feed {
    NewFeed {
        created_at: 1,
        updated_at: 1,
        name: "feed",
        url,
        description: None,
        user_id,
    }
    .insert(conn)
    .expect("Failed to insert feed")
}

/// Serves exactly one HTTP response on an ephemeral local port and returns
/// the URL to request.
pub fn serve_http_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/feed")
}

/// Accepts one connection and then goes silent for `delay` before hanging
/// up, for exercising fetch timeouts.
pub fn serve_http_stall(delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            std::thread::sleep(delay);
        }
    });
    format!("http://{addr}/feed")
}
