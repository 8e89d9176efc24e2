use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable consulted when no token is given on the command line.
pub const TOKEN_ENV_VAR: &str = "PLEXGRAB_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Account token, the same value the web client keeps in local storage.
    pub token: Option<String>,
    /// Override for the account service address.
    pub account_url: Option<String>,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadConfig {
    pub output_dir: Option<PathBuf>,
}

impl DownloadConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Load the config file from the default location. A missing file is not
    /// an error: the token can still arrive via flag or environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.clone()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "plexgrab")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(account_url) = &self.account_url {
            // Strip trailing slash for consistency
            let url = account_url.trim_end_matches('/');
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(
                    "account_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Pick the account token: command-line override first, then the
    /// environment, then the config file. Blank values count as absent.
    pub fn resolve_token(&self, override_token: Option<&str>) -> Option<String> {
        let candidates = [
            override_token.map(str::to_string),
            std::env::var(TOKEN_ENV_VAR).ok(),
            self.token.clone(),
        ];

        candidates
            .into_iter()
            .flatten()
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.token, None);
        assert_eq!(config.account_url, None);
        assert_eq!(config.download.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
token = "tok123"
account_url = "https://plex.example"

[download]
output_dir = "/data/media"
"#,
        )
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("tok123"));
        assert_eq!(config.account_url.as_deref(), Some("https://plex.example"));
        assert_eq!(config.download.output_dir(), PathBuf::from("/data/media"));
    }

    #[test]
    fn test_validate_rejects_bad_account_url() {
        let config: Config = toml::from_str(r#"account_url = "plex.example""#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_resolve_token_override_wins() {
        let config = Config {
            token: Some("fromConfig".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_token(Some("fromFlag")).as_deref(),
            Some("fromFlag")
        );
    }

    #[test]
    fn test_resolve_token_falls_back_to_config() {
        let config = Config {
            token: Some("fromConfig".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_token(None).as_deref(), Some("fromConfig"));
    }

    #[test]
    fn test_resolve_token_skips_blank_values() {
        let config = Config {
            token: Some("fromConfig".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_token(Some("  ")).as_deref(), Some("fromConfig"));
    }

    #[test]
    fn test_resolve_token_none_available() {
        let config = Config {
            token: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_token(None), None);
    }
}
