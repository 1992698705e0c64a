//! Runtime configuration.
//!
//! - [`HeaderLayout`] - which CSV columns are attributes and which are properties
//! - [`Settings`] - environment-driven defaults for the CLI and server
//!
//! Environment variables (a `.env` file is loaded if present):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NFTMINT_ENDPOINT` | none (required for real minting) |
//! | `NFTMINT_SUPPLY_KEY` | none |
//! | `NFTMINT_BATCH_SIZE` | `10` |
//! | `NFTMINT_OUTPUT_DIR` | `.nftmint/output` |
//! | `NFTMINT_PORT` | `3000` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Default number of items per mint batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default directory for generated metadata files.
pub const DEFAULT_OUTPUT_DIR: &str = ".nftmint/output";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Header Layout
// =============================================================================

/// Attribute and property column names of a metadata CSV.
///
/// Loaded from JSON:
///
/// ```json
/// { "attributes": ["color", "power"], "properties": ["external_url", "url"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLayout {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default = "default_properties")]
    pub properties: Vec<String>,
}

fn default_properties() -> Vec<String> {
    vec!["external_url".to_string(), "url".to_string()]
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            properties: default_properties(),
        }
    }
}

impl HeaderLayout {
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Append attribute columns not already declared, keeping order.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = String>) -> Self {
        for attribute in attributes {
            let attribute = attribute.trim().to_string();
            if !attribute.is_empty() && !self.attributes.contains(&attribute) {
                self.attributes.push(attribute);
            }
        }
        self
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Defaults read from the environment. CLI flags override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub supply_key: Option<String>,
    pub batch_size: usize,
    pub output_dir: PathBuf,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            supply_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Load from the process environment (and `.env`).
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let batch_size = match non_empty("NFTMINT_BATCH_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "NFTMINT_BATCH_SIZE",
                        value: raw,
                    })
                }
            },
            None => defaults.batch_size,
        };

        let port = match non_empty("NFTMINT_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                var: "NFTMINT_PORT",
                value: raw.clone(),
            })?,
            None => defaults.port,
        };

        Ok(Self {
            endpoint: non_empty("NFTMINT_ENDPOINT"),
            supply_key: non_empty("NFTMINT_SUPPLY_KEY"),
            batch_size,
            output_dir: non_empty("NFTMINT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_settings_from_vars() {
        let settings = Settings::from_lookup(lookup(&[
            ("NFTMINT_ENDPOINT", "http://localhost:8080"),
            ("NFTMINT_BATCH_SIZE", "5"),
            ("NFTMINT_OUTPUT_DIR", "/tmp/nfts"),
            ("NFTMINT_SUPPLY_KEY", " "),
        ]))
        .unwrap();

        assert_eq!(settings.endpoint.as_deref(), Some("http://localhost:8080"));
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/nfts"));
        assert_eq!(settings.supply_key, None);
    }

    #[test]
    fn test_invalid_batch_size_rejected() {
        let err = Settings::from_lookup(lookup(&[("NFTMINT_BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "NFTMINT_BATCH_SIZE", .. }));

        let err = Settings::from_lookup(lookup(&[("NFTMINT_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("NFTMINT_PORT"));
    }

    #[test]
    fn test_layout_from_json() {
        let layout = HeaderLayout::from_json(r#"{ "attributes": ["color", "power"] }"#).unwrap();
        assert_eq!(layout.attributes, vec!["color", "power"]);
        assert_eq!(layout.properties, vec!["external_url", "url"]);

        assert!(HeaderLayout::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_with_attributes_extends_layout() {
        let layout = HeaderLayout::default().with_attributes(vec!["color".to_string()]);
        assert_eq!(layout.attributes, vec!["color"]);
        assert_eq!(layout.properties, vec!["external_url", "url"]);

        let layout = HeaderLayout::from_json(r#"{ "attributes": ["color", "power"] }"#)
            .unwrap()
            .with_attributes(["power", " stamina ", "", "color"].map(String::from));
        assert_eq!(layout.attributes, vec!["color", "power", "stamina"]);
    }
}
