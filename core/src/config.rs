use std::collections::HashMap;
use std::fmt;

pub const API_KEY_VAR: &str = "NOTION_API_KEY";
pub const DATABASE_ID_VAR: &str = "NOTION_DATABASE_ID";

/// Source of configuration values, looked up on every request.
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub database_id: String,
}

impl Credentials {
    /// Unset and empty variables both count as missing. Every missing
    /// variable is reported, not just the first.
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigError> {
        let api_key = non_empty(env, API_KEY_VAR);
        let database_id = non_empty(env, DATABASE_ID_VAR);

        match (api_key, database_id) {
            (Some(api_key), Some(database_id)) => Ok(Self { api_key, database_id }),
            (api_key, database_id) => {
                let missing = [(API_KEY_VAR, api_key.is_none()), (DATABASE_ID_VAR, database_id.is_none())]
                    .into_iter()
                    .filter(|(_, missing)| *missing)
                    .map(|(name, _)| name)
                    .collect();
                Err(ConfigError::Missing(missing))
            }
        }
    }
}

fn non_empty(env: &dyn Environment, key: &str) -> Option<String> {
    env.var(key).filter(|value| !value.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}
