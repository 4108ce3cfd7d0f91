//! Configuration loader and validator for the Open Graph → Notion importer.
//!
//! Non-secret settings come from an optional YAML file; the Notion credential
//! and target database are only ever read from the environment.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_ACCESS_KEY: &str = "WWDC_IMPORTER_NOTION_ACCESS_KEY";
pub const ENV_DB_ID: &str = "WWDC_IMPORTER_DB_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("you need to set `{0}`")]
    MissingEnv(&'static str),
}

/// Root settings struct mirroring the YAML schema. Every field is optional in
/// the file and falls back to the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub notion: Notion,
    pub http: Http,
}

/// Notion API settings and the property names written on each page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notion {
    pub version: String,
    pub base_url: String,
    pub properties: Properties,
}

impl Default for Notion {
    fn default() -> Self {
        Self {
            version: "2022-06-28".into(),
            base_url: "https://api.notion.com/".into(),
            properties: Properties::default(),
        }
    }
}

/// Database property names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Properties {
    pub title: String,
    pub year: String,
    pub url: String,
    pub image: String,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            title: "Name".into(),
            year: "Year".into(),
            url: "URL".into(),
            image: "Image".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Http {
    pub user_agent: String,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            user_agent: concat!("og-notion/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Notion credentials resolved from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub database_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"[REDACTED]")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary lookup. Blank values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };
        Ok(Self {
            access_key: required(ENV_ACCESS_KEY)?,
            database_id: required(ENV_DB_ID)?,
        })
    }
}

/// Load settings from a YAML file and validate them.
/// - If `path` is None, the built-in defaults are used.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Settings::default(),
    };
    validate(&settings)?;
    Ok(settings)
}

/// Validate a settings instance.
fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.notion.version.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.version must be non-empty"));
    }
    if reqwest::Url::parse(&settings.notion.base_url).is_err() {
        return Err(ConfigError::Invalid("notion.base_url must be an absolute URL"));
    }

    let p = &settings.notion.properties;
    if p.title.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.properties.title must be non-empty"));
    }
    if p.year.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.properties.year must be non-empty"));
    }
    if p.url.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.properties.url must be non-empty"));
    }
    if p.image.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.properties.image must be non-empty"));
    }

    if settings.http.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("http.user_agent must be non-empty"));
    }

    Ok(())
}

/// Returns a fully spelled-out example settings file.
pub fn example() -> &'static str {
    r#"notion:
  version: "2022-06-28"
  base_url: "https://api.notion.com/"
  properties:
    title: "Name"
    year: "Year"
    url: "URL"
    image: "Image"

http:
  user_agent: "og-notion/0.1"
"#
}
