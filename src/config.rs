//! Configuration file handling for RentPacer.
//!
//! The configuration file is stored at `$RENTPACER_HOME/config.json`. It holds the scheduler
//! settings, the simulated card processing delay, and the settings for the AI assistant. The
//! wallet itself is not configuration; it lives in the state blob next to this file.

use crate::scheduler::BacklogPolicy;
use crate::store::FileStore;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "rentpacer";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const TICK_INTERVAL_SECS: u64 = 10;
const CARD_PROCESSING_DELAY_MS: u64 = 1500;
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_TIMEOUT_SECS: u64 = 60;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$RENTPACER_HOME` and from there it loads `$RENTPACER_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory if needed and writes a default `config.json` into it. An
    /// existing `config.json` is loaded instead of being overwritten.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the rentpacer home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = if config_path.is_file() {
            ConfigFile::load(&config_path).await?
        } else {
            let config_file = ConfigFile::default();
            config_file.save(&config_path).await?;
            config_file
        };

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// Validates that `rentpacer_home` and its config file exist, then loads the config file.
    pub async fn load(rentpacer_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = rentpacer_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("RentPacer Home is missing, run 'rentpacer init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The store the application state is persisted to, rooted at the home directory.
    pub fn store(&self) -> FileStore {
        FileStore::new(&self.root)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.config_file.tick_interval_secs)
    }

    pub fn backlog_policy(&self) -> BacklogPolicy {
        self.config_file.backlog_policy
    }

    pub fn card_processing_delay(&self) -> Duration {
        Duration::from_millis(self.config_file.card_processing_delay_ms)
    }

    pub fn assistant(&self) -> &AssistantSettings {
        &self.config_file.assistant
    }
}

/// Represents the serialization format of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Must be "rentpacer"
    app_name: String,

    /// Currently 1
    config_version: u8,

    /// Seconds between scheduler checks in `rentpacer run`
    #[serde(default = "default_tick_interval_secs")]
    tick_interval_secs: u64,

    /// What a due release does when the balance is short
    #[serde(default)]
    backlog_policy: BacklogPolicy,

    /// Simulated card processing time in milliseconds, 0 disables it
    #[serde(default = "default_card_processing_delay_ms")]
    card_processing_delay_ms: u64,

    #[serde(default)]
    assistant: AssistantSettings,
}

fn default_tick_interval_secs() -> u64 {
    TICK_INTERVAL_SECS
}

fn default_card_processing_delay_ms() -> u64 {
    CARD_PROCESSING_DELAY_MS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            tick_interval_secs: TICK_INTERVAL_SECS,
            backlog_policy: BacklogPolicy::default(),
            card_processing_delay_ms: CARD_PROCESSING_DELAY_MS,
            assistant: AssistantSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and checks its `app_name`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.tick_interval_secs > 0,
            "tick_interval_secs must be greater than zero"
        );

        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Settings for the Gemini client. The API key itself is never stored, only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_model")]
    model: String,

    #[serde(default = "default_base_url")]
    base_url: String,

    #[serde(default = "default_api_key_env")]
    api_key_env: String,

    /// Request timeout; `null` waits indefinitely
    #[serde(default = "default_timeout_secs")]
    timeout_secs: Option<u64>,
}

fn default_model() -> String {
    GEMINI_MODEL.to_string()
}

fn default_base_url() -> String {
    GEMINI_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    GEMINI_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> Option<u64> {
    Some(GEMINI_TIMEOUT_SECS)
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AssistantSettings {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    #[cfg(test)]
    pub(crate) fn with_api_key_env(mut self, name: &str) -> Self {
        self.api_key_env = name.to_string();
        self
    }
}
