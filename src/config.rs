//! Paths and user settings
//!
//! Settings live in an optional TOML file (`~/.config/nihongo/config.toml` on Linux).
//! A missing file means defaults; the enrichment provider is only enabled when an
//! API key and a model are both available.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APP_NAME: &str = "nihongo";
pub const DB_ENV: &str = "NIHONGO_DB";
pub const DATA_ENV: &str = "NIHONGO_DATA";
pub const MODEL_ENV: &str = "OPENAI_MODEL";

const DEFAULT_DB_FILENAME: &str = "nihongo.db";
const DEFAULT_DATA_DIRNAME: &str = "data";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine a data directory")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Where the database and the corpus live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Paths {
    /// Resolve paths: explicit flag, then environment, then platform default
    pub fn resolve(db_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let db_path = match db_path.map(Path::to_path_buf).or_else(|| env_path(DB_ENV)) {
            Some(path) => path,
            None => dirs::data_local_dir()
                .map(|p| p.join(APP_NAME).join(DEFAULT_DB_FILENAME))
                .ok_or(ConfigError::DataDirNotFound)?,
        };
        let data_dir = data_dir
            .map(Path::to_path_buf)
            .or_else(|| env_path(DATA_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIRNAME));

        Ok(Self {
            data_dir: expand_home(data_dir),
            db_path: expand_home(db_path),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn expand_home(path: PathBuf) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or(path),
        Err(_) => path,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub study: StudySettings,
    pub enrichment: EnrichmentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudySettings {
    /// Questions per session when `--count` is not given
    pub default_count: usize,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self { default_count: 30 }
    }
}

/// Chat-completions endpoint used to enrich honorific explanations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    /// Model name; `OPENAI_MODEL` takes precedence
    pub model: Option<String>,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 120,
            timeout_secs: 30,
        }
    }
}

impl EnrichmentSettings {
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|key| !key.trim().is_empty())
    }

    pub fn resolved_model(&self) -> Option<String> {
        env::var(MODEL_ENV)
            .ok()
            .filter(|model| !model.trim().is_empty())
            .or_else(|| self.model.clone())
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_NAME).join("config.toml"))
    }

    /// Load settings from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
