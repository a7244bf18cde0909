use thiserror::Error;

/// Application-wide error taxonomy.
///
/// The scheduler treats `Fetch`/`Parse` as transient (log and retry on the
/// feed's next turn); everything else is surfaced to the caller. CLI
/// commands print the message and exit non-zero.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: empty arguments, bad URLs, a feed document with no
    /// channel title. Never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The feed URL or follow pair already exists.
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Network-level failure: connect error, timeout, non-2xx status.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The response body is not a recognizable syndication document.
    #[error("could not parse feed: {0}")]
    Parse(String),

    /// Storage unavailable or a query failed for a non-constraint reason.
    #[error("storage error: {0}")]
    Store(String),

    /// A "should never happen" lookup failed, e.g. the logged-in user's row
    /// vanished between check and use. Returned normally so callers and
    /// tests can assert on it instead of the process aborting.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("usage: {0}")]
    Usage(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match err {
            DieselError::NotFound => AppError::NotFound("record".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::Duplicate(info.message().to_string())
            }
            other => {
                log::error!("Database error: {other}");
                AppError::Store(other.to_string())
            }
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        log::error!("Database connection pool error: {err}");
        AppError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Fetch(format!("timed out: {err}"))
        } else {
            AppError::Fetch(err.to_string())
        }
    }
}

impl From<feed_rs::parser::ParseFeedError> for AppError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
