pub mod commands;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod ingest;
pub mod models;
pub mod scheduler;
pub mod schema;
pub mod test_helpers;

use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::errors::{AppError, AppResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/migrations");

pub type DbPool = diesel::r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite does not enforce foreign keys unless asked; the cascades on user
/// deletion depend on it, so every pooled connection turns it on.
#[derive(Debug)]
struct ConnectionSetup;

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query("PRAGMA foreign_keys = ON;")
            .execute(conn)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn initialize_db_pool(db_url: &str) -> AppResult<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_url);
    diesel::r2d2::Pool::builder()
        .connection_customizer(Box::new(ConnectionSetup))
        .build(manager)
        .map_err(Into::into)
}

/// Brings the configured database up to the current schema.
pub fn run_migrations(conn: &mut SqliteConnection) -> AppResult<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| AppError::Store(format!("could not run migrations: {e}")))
}
