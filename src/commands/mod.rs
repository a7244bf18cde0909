pub mod agg;
pub mod feeds;
pub mod users;

use std::collections::HashMap;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::user::User;
use crate::{DbConn, DbPool};

/// Everything a command handler needs: the loaded config and the store pool.
pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
}

impl AppState {
    pub fn conn(&self) -> AppResult<DbConn> {
        self.pool.get().map_err(Into::into)
    }
}

/// A parsed CLI invocation: the command name plus its positional arguments.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// The argument at `index`, or a usage error naming the expected shape.
    pub fn arg(&self, index: usize, usage: &str) -> AppResult<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| AppError::Usage(usage.to_string()))
    }
}

pub type Handler = fn(&mut AppState, &Command) -> AppResult<()>;

/// Dispatch table from command name to handler, built once at startup and
/// passed by reference into the runner.
#[derive(Default)]
pub struct Commands {
    handlers: HashMap<&'static str, Handler>,
}

impl Commands {
    pub fn register(&mut self, name: &'static str, handler: Handler) -> AppResult<()> {
        if self.handlers.insert(name, handler).is_some() {
            return Err(AppError::InvariantViolation(format!(
                "command registered twice: {name}"
            )));
        }
        Ok(())
    }

    pub fn run(&self, state: &mut AppState, cmd: &Command) -> AppResult<()> {
        let handler = self
            .handlers
            .get(cmd.name.as_str())
            .ok_or_else(|| AppError::NotFound(format!("command {}", cmd.name)))?;
        handler(state, cmd)
    }

    /// The full command set of the application.
    pub fn default_set() -> AppResult<Commands> {
        let mut commands = Commands::default();
        commands.register("login", users::login)?;
        commands.register("register", users::register)?;
        commands.register("reset", users::reset)?;
        commands.register("users", users::users)?;
        commands.register("addfeed", feeds::addfeed)?;
        commands.register("feeds", feeds::feeds)?;
        commands.register("follow", feeds::follow)?;
        commands.register("unfollow", feeds::unfollow)?;
        commands.register("following", feeds::following)?;
        commands.register("browse", feeds::browse)?;
        commands.register("agg", agg::agg)?;
        Ok(commands)
    }
}

/// The logged-in user's row. Not being logged in is a validation error; a
/// config naming a user with no row is an invariant violation, since login
/// checked the row existed.
pub fn require_user(state: &AppState) -> AppResult<User> {
    let name = state
        .config
        .current_user_name
        .clone()
        .ok_or_else(|| AppError::Validation("not logged in; run `login <name>` first".to_string()))?;
    let mut conn = state.conn()?;
    User::get_by_name(&mut conn, &name).map_err(|e| match e {
        AppError::NotFound(_) => {
            AppError::InvariantViolation(format!("logged-in user {name} has no user row"))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_state: &mut AppState, _cmd: &Command) -> AppResult<()> {
        Ok(())
    }

    #[test]
    fn test_double_registration_is_invariant_violation() {
        let mut commands = Commands::default();
        commands.register("login", noop).unwrap();
        let err = commands.register("login", noop).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
    }

    #[test]
    fn test_default_set_builds() {
        Commands::default_set().unwrap();
    }

    #[test]
    fn test_missing_arg_is_usage_error() {
        let cmd = Command {
            name: "login".to_string(),
            args: vec![],
        };
        let err = cmd.arg(0, "login <name>").unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }
}
