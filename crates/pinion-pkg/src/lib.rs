//! Dependency version pinning for mod manifests.
//!
//! This crate provides:
//! - Parsing and round-tripping of dependency declarators (`? flib >= 0.15`)
//! - A release catalog abstraction with a mod portal HTTP client
//! - Release selection by compatibility tag and version
//! - The pin policy that rewrites dependency constraints
//! - The patch bump policy for a package's own version
//! - Manifest loading/writing, discovery and configuration

mod bump;
mod catalog;
mod config;
mod declarator;
mod discover;
mod manifest;
mod pin;
mod process;
mod select;
mod version;

pub use bump::{bump_patch, decide_bump, BumpDecision, BumpInputs};
pub use catalog::{
    decode_releases, CatalogError, MemoryCatalog, PortalClient, PortalConfig, ReleaseCandidate,
    ReleaseCatalog, DEFAULT_REGISTRY_URL, DEFAULT_TAG_FIELD, DEFAULT_TIMEOUT,
};
pub use config::{Config, ConfigError, CONFIG_FILE};
pub use declarator::{Constraint, Declarator, DeclaratorError, Flag, Operator};
pub use discover::{discover_manifests, DiscoverError};
pub use manifest::{Manifest, ManifestError, ManifestPackage, MANIFEST_FILE};
pub use pin::{
    DependencyOutcome, DependencyUpdate, PinContext, PinMode, PinPolicy, ReservedNames,
    BASE_PACKAGE,
};
pub use process::{PinOptions, PinReport, Pinner};
pub use select::select_best;
pub use version::{VersionError, VersionTuple};
