//! TOML configuration. Every field has a default, so a missing file is a
//! valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::color::ColorScheme;
use crate::data::{APP_ID, BOUNDARIES_URL, GDELT_LASTUPDATE_URL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub reference: ReferenceConfig,
    pub schedule: ScheduleConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Plaintext file naming the newest export archive.
    pub pointer_url: String,
    /// Prefix for a pass-through proxy; the target URL is percent-encoded
    /// and appended.
    pub proxy_prefix: Option<String>,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pointer_url: GDELT_LASTUPDATE_URL.to_string(),
            proxy_prefix: None,
            user_agent: format!("{}/{}", APP_ID, env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Each entry is a local path or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub cameo_codes: String,
    pub country_coordinates: String,
    pub boundaries: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            cameo_codes: "cameo-event-codes.json".to_string(),
            country_coordinates: "country-coordinates.json".to_string(),
            boundaries: BOUNDARIES_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Upstream publishes the next file this long after the current one.
    pub publish_lag_minutes: i64,
    pub grace_seconds: i64,
    /// Delay used when the expected publish time has already passed.
    pub retry_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            publish_lag_minutes: 25,
            grace_seconds: 1,
            retry_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub color_scheme: ColorScheme,
    pub point_size: f64,
    /// Opacity of the dominant-category country fill.
    pub polygon_alpha: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Category,
            point_size: 0.3,
            polygon_alpha: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where each snapshot is written as JSON.
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    /// `<config_dir>/eventglobe/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`. Only an
    /// explicitly given path is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
