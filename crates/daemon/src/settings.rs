//! Worker settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `jobharvest.toml` in the working directory, then `JOBHARVEST_*` variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use jobharvest_core::application::dispatcher::{
    DispatchConfig, DEFAULT_SCRAPE_INTERVAL_MINUTES, DEFAULT_SCRAPE_QUEUE, SCRAPE_RUN_TASK,
};
use jobharvest_core::application::scrape_service::DEFAULT_RENDER_ENGINE;
use jobharvest_core::application::worker::constants::DEFAULT_DISPATCH_TICK;
use jobharvest_core::application::ScrapeConfig;
use jobharvest_core::error::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "jobharvest";
const ENV_PREFIX: &str = "JOBHARVEST";

/// Where dedupe and last-dispatch markers live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Redis,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub api_base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    pub request_timeout_seconds: u64,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub database_url: String,
    pub render_engine: String,
    pub default_scrape_interval_minutes: u32,
    pub scrape_queue_name: String,
    pub dispatch_tick_seconds: u64,
    pub log_format: LogFormat,
}

impl WorkerSettings {
    /// Load from defaults, `jobharvest.toml` and the environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()
            .map_err(map_config_error)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::from_builder(builder)
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("api_base_url", "http://localhost:8000")?
            .set_default("request_timeout_seconds", 30)?
            .set_default("store_backend", "sqlite")?
            .set_default("redis_url", "redis://127.0.0.1:6379/0")?
            .set_default("database_url", "sqlite://jobharvest.db")?
            .set_default("render_engine", DEFAULT_RENDER_ENGINE)?
            .set_default("default_scrape_interval_minutes", DEFAULT_SCRAPE_INTERVAL_MINUTES)?
            .set_default("scrape_queue_name", DEFAULT_SCRAPE_QUEUE)?
            .set_default("dispatch_tick_seconds", DEFAULT_DISPATCH_TICK.as_secs())?
            .set_default("log_format", "pretty")
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(map_config_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_scrape_interval_minutes == 0 {
            return Err(AppError::Config(
                "default_scrape_interval_minutes must be greater than zero".into(),
            ));
        }
        if self.dispatch_tick_seconds == 0 {
            return Err(AppError::Config(
                "dispatch_tick_seconds must be greater than zero".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn dispatch_tick(&self) -> Duration {
        Duration::from_secs(self.dispatch_tick_seconds)
    }

    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            render_engine: self.render_engine.clone(),
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            default_interval_minutes: self.default_scrape_interval_minutes,
            queue_name: self.scrape_queue_name.clone(),
            task_name: SCRAPE_RUN_TASK.to_string(),
        }
    }
}

fn map_config_error(err: config::ConfigError) -> AppError {
    AppError::Config(err.to_string())
}
