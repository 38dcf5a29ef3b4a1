use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ChronicleError, Result};
use crate::export::DEFAULT_OUTPUT_FILE;

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Variables already set in the environment
/// 2. Current directory .env
/// 3. ~/.chronicle/.env
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path.display().to_string());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            // dotenvy never overwrites variables that are already set
            match dotenvy::from_path(&env_file) {
                Ok(_) => loaded_from.push(env_file.display().to_string()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.chronicle)");
    } else {
        info!("Loaded environment from: {}", loaded_from.join(", "));
    }
}

/// Get the chronicle config directory path (~/.chronicle)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chronicle"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChronicleConfig {
    #[serde(default)]
    pub parse: ParseConfig,

    #[serde(default)]
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseConfig {
    /// Where `chronicle parse` writes flattened conversations
    #[serde(default = "default_parse_output")]
    pub output_file: PathBuf,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            output_file: default_parse_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveConfig {
    /// Authorized-user token file (written back after refresh)
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// OAuth client secrets downloaded from the Google Cloud Console
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    #[serde(default = "default_drive_output")]
    pub output_file: PathBuf,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Override for the Drive v3 endpoint
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            credentials_file: default_credentials_file(),
            output_file: default_drive_output(),
            page_size: default_page_size(),
            api_base: None,
        }
    }
}

fn default_parse_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_drive_output() -> PathBuf {
    PathBuf::from("google_drive_activity.json")
}

fn default_page_size() -> u32 {
    20
}

impl ChronicleConfig {
    /// Load config from TOML files
    ///
    /// Priority order (highest to lowest):
    /// 1. ./chronicle.toml (project-specific)
    /// 2. ~/.chronicle/config.toml (user defaults)
    /// 3. Built-in defaults
    ///
    /// A file that fails to parse is reported and skipped.
    pub fn load() -> Self {
        let mut config = ChronicleConfig::default();

        if let Some(global_config_path) = config_dir().map(|d| d.join("config.toml")) {
            if let Some(global) = Self::read_file(&global_config_path) {
                config = global;
            }
        }

        if let Some(local) = Self::read_file(Path::new("chronicle.toml")) {
            config = local;
        }

        config
    }

    /// Parse a config document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ChronicleError::config(e.to_string()))
    }

    fn read_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChronicleConfig::default();
        assert_eq!(config.parse.output_file, PathBuf::from("chatgpt_conversations.json"));
        assert_eq!(config.drive.page_size, 20);
        assert_eq!(config.drive.token_file, PathBuf::from("token.json"));
        assert_eq!(config.drive.api_base, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ChronicleConfig::from_toml(
            r#"
            [drive]
            page_size = 5
            token_file = "/secrets/token.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.drive.page_size, 5);
        assert_eq!(config.drive.token_file, PathBuf::from("/secrets/token.json"));
        assert_eq!(config.drive.output_file, PathBuf::from("google_drive_activity.json"));
        assert_eq!(config.parse, ParseConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ChronicleConfig::from_toml("[drive\npage_size = 1").unwrap_err();
        assert!(matches!(err, ChronicleError::Config { .. }));
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_config_dir_is_a_path_lookup() {
        let Some(dir) = config_dir() else {
            return;
        };
        assert!(dir.ends_with(".chronicle"));
        assert_eq!(dir.parent(), dirs::home_dir().as_deref());
    }
}
