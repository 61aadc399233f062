//! Handles settings for the application. Configuration is written in
//! `settings.toml`.
//!
//! See `settings.toml.example` for the configuration.
use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Broadcast {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_send_gap_ms")]
    pub send_gap_ms: u64,
}

impl Default for Broadcast {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            send_gap_ms: default_send_gap_ms(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_send_gap_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub telegram: Telegram,
    #[serde(default)]
    pub broadcast: Broadcast,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
