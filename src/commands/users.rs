use chrono::Utc;

use super::{AppState, Command};
use crate::errors::AppResult;
use crate::models::user::User;

/// Logs in a registered user by writing their name to the config file.
pub fn login(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    let name = cmd.arg(0, "login <name>")?.to_string();
    {
        let mut conn = state.conn()?;
        User::get_by_name(&mut conn, &name)?;
    }
    state.config.set_current_user(&name)?;
    println!("Logged in as {name}");
    Ok(())
}

/// Registers a new user, then logs them in.
pub fn register(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    let name = cmd.arg(0, "register <name>")?.to_string();
    {
        let mut conn = state.conn()?;
        let user = User::create(&mut conn, &name, Utc::now().timestamp() as i32)?;
        println!("Created user {}", user.name);
    }
    login(state, cmd)
}

/// Deletes every user; feeds, follows and posts cascade. Dev tool.
pub fn reset(state: &mut AppState, _cmd: &Command) -> AppResult<()> {
    let mut conn = state.conn()?;
    let removed = User::delete_all(&mut conn)?;
    println!("Removed {removed} user(s)");
    Ok(())
}

/// Lists all users, marking the current one.
pub fn users(state: &mut AppState, _cmd: &Command) -> AppResult<()> {
    let current = state.config.current_user_name.clone();
    let mut conn = state.conn()?;
    for user in User::get_all(&mut conn)? {
        if current.as_deref() == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}
