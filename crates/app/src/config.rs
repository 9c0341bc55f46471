//! Application configuration: input and output paths

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Image decoded into the bottom layer, if set
pub const ENV_IMAGE: &str = "IMPASTO_IMAGE";

/// Where the finished canvas is written
pub const ENV_OUTPUT: &str = "IMPASTO_OUTPUT";

pub const DEFAULT_OUTPUT: &str = "impasto.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub image: Option<PathBuf>,
    pub output: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl AppConfig {
    /// Parse from environment variables IMPASTO_IMAGE and IMPASTO_OUTPUT
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        Self {
            image: non_empty(ENV_IMAGE).map(PathBuf::from),
            output: non_empty(ENV_OUTPUT)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output, PathBuf::from("impasto.png"));
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = AppConfig::from_lookup(|key| match key {
            ENV_IMAGE => Some("photo.jpg".to_string()),
            ENV_OUTPUT => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.image, Some(PathBuf::from("photo.jpg")));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = AppConfig {
            image: Some(PathBuf::from("in.png")),
            output: PathBuf::from("out.png"),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<AppConfig>(&json).unwrap(), config);
    }
}
