use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};

use crate::domain::search::expander::{DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub app_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SearchSettings {
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub expander: Option<ExpanderSettings>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            source_timeout_ms: default_source_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            expander: None,
        }
    }
}

impl SearchSettings {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// OpenAI-compatible endpoint used to expand slang before rule matching.
#[derive(Deserialize, Clone, Debug)]
pub struct ExpanderSettings {
    pub api_key: String,
    #[serde(default = "default_expander_base_url")]
    pub base_url: String,
    #[serde(default = "default_expander_model")]
    pub model: String,
    #[serde(default = "default_expander_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Catalog,
    Marketplace,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SourceSettings {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    /// JSON file for catalog sources
    pub path: Option<String>,
    /// API root for marketplace sources
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

fn default_source_timeout_ms() -> u64 {
    8_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_expander_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_expander_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_expander_timeout_ms() -> u64 {
    3_000
}

fn default_enabled() -> bool {
    true
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("CARFINDER")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
