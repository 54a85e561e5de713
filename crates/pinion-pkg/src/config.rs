//! Tool configuration (`pinion.toml`).
//!
//! ```toml
//! local-packages = ["qol-lite", "qol-plus"]
//! registry-url = "https://mods.factorio.com"
//! timeout-secs = 15
//! tag-field = "factorio_version"
//! manifest-file = "info.json"
//! mode = "gte"
//! ```
//!
//! Every key is optional.

use crate::catalog::{PortalConfig, DEFAULT_TAG_FIELD};
use crate::manifest::MANIFEST_FILE;
use crate::pin::{PinMode, ReservedNames};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// The configuration filename.
pub const CONFIG_FILE: &str = "pinion.toml";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings shared by every manifest in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Packages that live alongside the manifests and are never pinned.
    #[serde(default)]
    pub local_packages: Vec<String>,

    /// Registry base URL.
    #[serde(default)]
    pub registry_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Manifest and release field holding the compatibility tag.
    #[serde(default)]
    pub tag_field: Option<String>,

    /// Manifest filename to look for.
    #[serde(default)]
    pub manifest_file: Option<String>,

    /// Default pin mode.
    #[serde(default)]
    pub mode: Option<PinMode>,
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `pinion.toml` from `dir` if it exists, else the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn find(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.is_file() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The compatibility tag field.
    #[must_use]
    pub fn tag_field(&self) -> &str {
        self.tag_field.as_deref().unwrap_or(DEFAULT_TAG_FIELD)
    }

    /// The manifest filename.
    #[must_use]
    pub fn manifest_file(&self) -> &str {
        self.manifest_file.as_deref().unwrap_or(MANIFEST_FILE)
    }

    /// Names never resolved against the catalog.
    #[must_use]
    pub fn reserved_names(&self) -> ReservedNames {
        ReservedNames::new().with_local_packages(self.local_packages.iter().cloned())
    }

    /// Portal client settings, starting from [`PortalConfig::default`].
    #[must_use]
    pub fn portal_config(&self) -> PortalConfig {
        let mut portal = PortalConfig::default();
        if let Some(ref url) = self.registry_url {
            portal.base_url.clone_from(url);
        }
        if let Some(secs) = self.timeout_secs {
            portal.timeout = Duration::from_secs(secs);
        }
        portal.tag_field = self.tag_field().to_string();
        portal
    }
}
