//! Release catalog: the published versions of a package.
//!
//! This module provides:
//! - The [`ReleaseCatalog`] trait the pinning engine queries
//! - [`PortalClient`], a blocking HTTP client for the mod portal API
//! - [`MemoryCatalog`], an in-memory catalog for tests and offline runs

use crate::version::VersionTuple;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Default portal base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://mods.factorio.com";

/// Default manifest/release field carrying the compatibility tag.
pub const DEFAULT_TAG_FIELD: &str = "factorio_version";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur while querying a catalog.
///
/// Every variant is recoverable: the dependency is left unresolved.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Transport failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The registry does not know the package.
    #[error("package '{0}' not found in registry")]
    NotFound(String),

    /// Non-success HTTP status.
    #[error("registry returned status {status} for '{name}'")]
    Status { name: String, status: u16 },

    /// The response body could not be decoded.
    #[error("malformed registry response: {0}")]
    Payload(String),

    /// The configured registry URL is unusable.
    #[error("invalid registry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// One published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    /// Parsed version used for ranking.
    pub version: VersionTuple,
    /// Version text as published.
    pub raw_version: String,
    /// Compatibility tag (e.g. target game version), if the release has one.
    pub compatibility_tag: Option<String>,
}

impl ReleaseCandidate {
    /// Build a candidate from published version text.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is not dotted numeric.
    pub fn new(
        raw_version: &str,
        compatibility_tag: Option<&str>,
    ) -> Result<Self, crate::VersionError> {
        Ok(Self {
            version: VersionTuple::parse(raw_version)?,
            raw_version: raw_version.to_string(),
            compatibility_tag: compatibility_tag.map(str::to_string),
        })
    }
}

/// Source of published releases.
pub trait ReleaseCatalog {
    /// Fetch every known release of `name`.
    ///
    /// An empty vector means the registry reports no releases.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached or answers garbage.
    fn fetch_releases(&self, name: &str) -> Result<Vec<ReleaseCandidate>, CatalogError>;
}

impl<C: ReleaseCatalog + ?Sized> ReleaseCatalog for &C {
    fn fetch_releases(&self, name: &str) -> Result<Vec<ReleaseCandidate>, CatalogError> {
        (**self).fetch_releases(name)
    }
}

/// Mod entry as returned by `GET /api/mods/{name}`.
#[derive(Debug, Deserialize)]
struct PortalEntry {
    #[serde(default)]
    releases: Option<Vec<PortalRelease>>,
}

#[derive(Debug, Deserialize)]
struct PortalRelease {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    info_json: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Decode a portal mod entry into release candidates.
///
/// Releases without a version are skipped, as are releases whose version is
/// not dotted numeric.
///
/// # Errors
///
/// Returns [`CatalogError::Payload`] if the body is not a JSON mod entry.
pub fn decode_releases(body: &str, tag_field: &str) -> Result<Vec<ReleaseCandidate>, CatalogError> {
    let entry: PortalEntry =
        serde_json::from_str(body).map_err(|e| CatalogError::Payload(e.to_string()))?;

    let mut candidates = Vec::new();
    for release in entry.releases.unwrap_or_default() {
        let Some(version) = release.version.filter(|v| !v.is_empty()) else {
            continue;
        };
        let tag = release
            .info_json
            .as_ref()
            .and_then(|info| info.get(tag_field))
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty());

        match ReleaseCandidate::new(&version, tag) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => tracing::debug!(%version, error = %e, "skipping release"),
        }
    }
    Ok(candidates)
}

/// Configuration for the portal client.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base URL of the portal, without the `/api` suffix.
    pub base_url: String,
    /// Field in each release's `info_json` holding the compatibility tag.
    pub tag_field: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Upper bound for a single request.
    pub timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PINION_REGISTRY_URL")
                .ok()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
            tag_field: DEFAULT_TAG_FIELD.to_string(),
            user_agent: format!("pinion/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the mod portal release API.
pub struct PortalClient {
    config: PortalConfig,
    http_client: reqwest::blocking::Client,
}

impl PortalClient {
    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: PortalConfig) -> Result<Self, CatalogError> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// URL of the mod entry for `name`.
    fn release_url(&self, name: &str) -> Result<reqwest::Url, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidUrl {
            url: self.config.base_url.clone(),
            reason,
        };

        let mut url = reqwest::Url::parse(&self.config.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["api", "mods", name]);
        Ok(url)
    }
}

impl ReleaseCatalog for PortalClient {
    fn fetch_releases(&self, name: &str) -> Result<Vec<ReleaseCandidate>, CatalogError> {
        let url = self.release_url(name)?;
        tracing::debug!(%url, "fetching releases");

        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        decode_releases(&body, &self.config.tag_field)
    }
}

/// An in-memory catalog.
///
/// Records every queried name so callers can check which packages were
/// looked up.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    releases: HashMap<String, Vec<ReleaseCandidate>>,
    unavailable: HashSet<String>,
    queries: RefCell<Vec<String>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a release of `name`.
    ///
    /// A version that is not dotted numeric is skipped, as the portal
    /// decoder does.
    #[must_use]
    pub fn with_release(mut self, name: &str, version: &str, tag: Option<&str>) -> Self {
        match ReleaseCandidate::new(version, tag) {
            Ok(candidate) => self
                .releases
                .entry(name.to_string())
                .or_default()
                .push(candidate),
            Err(e) => tracing::warn!(name, error = %e, "skipping release"),
        }
        self
    }

    /// Make every lookup of `name` fail as if the network were down.
    #[must_use]
    pub fn with_unavailable(mut self, name: &str) -> Self {
        self.unavailable.insert(name.to_string());
        self
    }

    /// Names queried so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl ReleaseCatalog for MemoryCatalog {
    fn fetch_releases(&self, name: &str) -> Result<Vec<ReleaseCandidate>, CatalogError> {
        self.queries.borrow_mut().push(name.to_string());
        if self.unavailable.contains(name) {
            return Err(CatalogError::Network(format!("{name}: connection refused")));
        }
        Ok(self.releases.get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const ENTRY: &str = r#"{
        "name": "flib",
        "releases": [
            {"version": "0.12.9", "info_json": {"factorio_version": "1.1"}},
            {"version": "0.15.0", "info_json": {"factorio_version": "2.0"}},
            {"version": "", "info_json": {"factorio_version": "2.0"}},
            {"info_json": {"factorio_version": "2.0"}},
            {"version": "0.16.0-rc1", "info_json": {"factorio_version": "2.0"}},
            {"version": "0.16.1"},
            {"version": "99999999999999999999999.0", "info_json": {"factorio_version": "2.0"}}
        ]
    }"#;

    #[test]
    fn test_decode_portal_entry() {
        let releases = decode_releases(ENTRY, DEFAULT_TAG_FIELD).unwrap();
        let raw: Vec<_> = releases.iter().map(|r| r.raw_version.as_str()).collect();
        assert_eq!(
            raw,
            vec!["0.12.9", "0.15.0", "0.16.1", "99999999999999999999999.0"]
        );
        assert_eq!(releases[0].compatibility_tag.as_deref(), Some("1.1"));
        assert_eq!(releases[2].compatibility_tag, None);
    }

    #[test]
    fn test_decode_custom_tag_field() {
        let body = r#"{"releases": [{"version": "1.0.0", "info_json": {"engine": "5"}}]}"#;
        let releases = decode_releases(body, "engine").unwrap();
        assert_eq!(releases[0].compatibility_tag.as_deref(), Some("5"));
    }

    #[test]
    fn test_decode_without_releases_is_empty() {
        assert!(decode_releases(r#"{"name": "x"}"#, DEFAULT_TAG_FIELD)
            .unwrap()
            .is_empty());
        assert!(decode_releases(r#"{"releases": null}"#, DEFAULT_TAG_FIELD)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_decode_garbage_is_payload_error() {
        let err = decode_releases("<html>", DEFAULT_TAG_FIELD).unwrap_err();
        assert!(matches!(err, CatalogError::Payload(_)));
    }

    #[test]
    fn test_release_url_joins_path() {
        let client = PortalClient::with_config(PortalConfig {
            base_url: "https://example.com/".to_string(),
            ..PortalConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.release_url("flib").unwrap().as_str(),
            "https://example.com/api/mods/flib"
        );
    }

    #[test]
    fn test_release_url_rejects_bad_base() {
        let client = PortalClient::with_config(PortalConfig {
            base_url: "not a url".to_string(),
            ..PortalConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.release_url("flib"),
            Err(CatalogError::InvalidUrl { .. })
        ));
    }

    fn portal(server: &MockServer, timeout: Duration) -> PortalClient {
        PortalClient::with_config(PortalConfig {
            base_url: server.base_url(),
            timeout,
            ..PortalConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_portal_fetches_and_decodes_releases() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/mods/flib");
            then.status(200)
                .header("content-type", "application/json")
                .body(ENTRY);
        });

        let releases = portal(&server, DEFAULT_TIMEOUT).fetch_releases("flib").unwrap();
        mock.assert();
        assert_eq!(releases.len(), 4);
        assert_eq!(releases[1].raw_version, "0.15.0");
        assert_eq!(releases[1].compatibility_tag.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_portal_uses_configured_tag_field() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/mods/thing");
            then.status(200)
                .body(r#"{"releases": [{"version": "1.0.0", "info_json": {"engine": "5"}}]}"#);
        });
        let client = PortalClient::with_config(PortalConfig {
            base_url: server.base_url(),
            tag_field: "engine".to_string(),
            ..PortalConfig::default()
        })
        .unwrap();

        let releases = client.fetch_releases("thing").unwrap();
        assert_eq!(releases[0].compatibility_tag.as_deref(), Some("5"));
    }

    #[test]
    fn test_portal_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/mods/ghost");
            then.status(404).body(r#"{"message": "Mod not found"}"#);
        });

        let err = portal(&server, DEFAULT_TIMEOUT)
            .fetch_releases("ghost")
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref name) if name == "ghost"));
    }

    #[test]
    fn test_portal_server_error_is_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/mods/flib");
            then.status(500);
        });

        let err = portal(&server, DEFAULT_TIMEOUT)
            .fetch_releases("flib")
            .unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 500, .. }));
    }

    #[test]
    fn test_portal_timeout_is_network_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/mods/slow");
            then.status(200)
                .body(ENTRY)
                .delay(Duration::from_secs(2));
        });

        let err = portal(&server, Duration::from_millis(100))
            .fetch_releases("slow")
            .unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
    }

    #[test]
    fn test_memory_catalog_skips_invalid_release() {
        let catalog = MemoryCatalog::new()
            .with_release("foo", "1.0-beta", None)
            .with_release("foo", "1.0.0", None);
        assert_eq!(catalog.fetch_releases("foo").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_catalog_records_queries() {
        let catalog = MemoryCatalog::new()
            .with_release("foo", "1.0.0", None)
            .with_unavailable("down");

        assert_eq!(catalog.fetch_releases("foo").unwrap().len(), 1);
        assert!(catalog.fetch_releases("missing").unwrap().is_empty());
        assert!(catalog.fetch_releases("down").is_err());
        assert_eq!(catalog.queries(), vec!["foo", "missing", "down"]);
    }
}
