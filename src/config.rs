use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

pub const CONFIG_FILE_NAME: &str = ".feedloop.json";

/// User-scoped JSON config file: the database connection string and the
/// currently logged-in user. Lives in the home directory unless
/// `FEEDLOOP_CONFIG` points somewhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub db_url: String,
    #[serde(default)]
    pub current_user_name: Option<String>,
}

impl Config {
    pub fn path() -> AppResult<PathBuf> {
        if let Ok(path) = std::env::var("FEEDLOOP_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = std::env::var("HOME")
            .map_err(|_| AppError::Config("HOME is not set".to_string()))?;
        Ok(Path::new(&home).join(CONFIG_FILE_NAME))
    }

    pub fn load() -> AppResult<Config> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Config> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::Config(format!("could not read {}: {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(AppError::Config(format!(
                "config file is empty: {}",
                path.display()
            )));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)
            .map_err(|e| AppError::Config(format!("could not write {}: {e}", path.display())))
    }

    /// Records `name` as the logged-in user and persists the change.
    pub fn set_current_user(&mut self, name: &str) -> AppResult<()> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }
}
