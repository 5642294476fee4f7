//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `TRIPSHARE__*` environment variables,
//! e.g. `TRIPSHARE__STORE__SQLITE=trips.db` or `store = { sqlite = "trips.db" }`.

use config::{Config, ConfigError, Environment, File};
use engine::EngineSettings;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Backend behind the engine.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Process memory, gone on exit.
    #[default]
    Memory,
    /// SQLite file, migrated on startup.
    Sqlite(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub store: Store,
    pub ledger: EngineSettings,
    /// Seed a demo trip at startup.
    pub seed_demo: bool,
    /// Account whose active trips get balance watchers.
    pub watch_user: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("TRIPSHARE"))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(environment.separator("__").try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }
}
