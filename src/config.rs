use log::{info, warn};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "doctor-scraper.toml";

const LEMIT_TOKEN_ENV: &str = "LEMIT_API_TOKEN";
const TALLOS_TOKEN_ENV: &str = "TALLOS_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("missing API token: set `{field}` in the config file or the {env} environment variable")]
    MissingToken { field: &'static str, env: &'static str },
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub lemit: LemitConfig,
    #[serde(default)]
    pub tallos: TallosConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LemitConfig {
    #[serde(default = "default_lemit_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TallosConfig {
    #[serde(default = "default_tallos_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

fn default_search_url() -> String {
    "https://crmma.org.br/busca-medicos".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_page_size() -> usize {
    10
}

fn default_lemit_url() -> String {
    "https://api.lemit.com.br/api/v1".to_string()
}

fn default_tallos_url() -> String {
    "https://api.tallos.com.br".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            search_url: default_search_url(),
            headless: default_headless(),
            page_size: default_page_size(),
        }
    }
}

impl Default for LemitConfig {
    fn default() -> Self {
        LemitConfig {
            base_url: default_lemit_url(),
            token: None,
        }
    }
}

impl Default for TallosConfig {
    fn default() -> Self {
        TallosConfig {
            base_url: default_tallos_url(),
            token: None,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, falling back to built-in defaults
    /// when the default config file is absent. Environment variables
    /// override tokens from the file.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    info!("No config file found, using defaults.");
                    Config::default()
                }
            }
        };

        if let Ok(token) = env::var(LEMIT_TOKEN_ENV) {
            config.lemit.token = Some(token);
        }
        if let Ok(token) = env::var(TALLOS_TOKEN_ENV) {
            config.tallos.token = Some(token);
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn lemit_token(&self) -> Result<&str, ConfigError> {
        match self.lemit.token.as_deref() {
            Some(t) if !t.is_empty() => Ok(t),
            _ => {
                warn!("Lemit API token is not configured.");
                Err(ConfigError::MissingToken {
                    field: "lemit.token",
                    env: LEMIT_TOKEN_ENV,
                })
            }
        }
    }

    pub fn tallos_token(&self) -> Result<&str, ConfigError> {
        match self.tallos.token.as_deref() {
            Some(t) if !t.is_empty() => Ok(t),
            _ => {
                warn!("Tallos API token is not configured.");
                Err(ConfigError::MissingToken {
                    field: "tallos.token",
                    env: TALLOS_TOKEN_ENV,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.search_url, "https://crmma.org.br/busca-medicos");
        assert!(config.registry.headless);
        assert_eq!(config.registry.page_size, 10);
        assert!(config.lemit.token.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let toml_str = r#"
            [registry]
            headless = false

            [tallos]
            token = "abc123"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.registry.headless);
        assert_eq!(config.registry.page_size, 10);
        assert_eq!(config.tallos.token.as_deref(), Some("abc123"));
        assert_eq!(config.tallos.base_url, "https://api.tallos.com.br");
        assert!(config.lemit.token.is_none());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let config = Config::default();
        assert!(config.tallos_token().is_err());
    }
}
