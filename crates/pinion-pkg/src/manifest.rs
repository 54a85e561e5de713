//! Mod manifest (`info.json`) loading and writing.
//!
//! Only the `dependencies` list and the `version` field are ever rewritten;
//! every other key is written back as read, in its original order.

use crate::catalog::DEFAULT_TAG_FIELD;
use crate::version::VersionError;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The manifest filename.
pub const MANIFEST_FILE: &str = "info.json";

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid manifest: {0}")]
    Shape(String),

    #[error("cannot bump declared version: {0}")]
    Version(#[from] VersionError),

    #[error("failed to write manifest file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The fields of a manifest the pinning engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestPackage {
    /// The package's own name; empty if the manifest has none.
    pub name: String,
    /// Compatibility tag (e.g. `factorio_version`).
    pub compatibility_tag: Option<String>,
    /// Declared version, trimmed; `None` when missing or blank.
    pub version: Option<String>,
    /// Dependency entries in manifest order.
    pub dependencies: Vec<String>,
}

/// A manifest document together with its decoded package fields.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Option<PathBuf>,
    document: Map<String, Value>,
    package: ManifestPackage,
}

impl Manifest {
    /// Load a manifest from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>, tag_field: &str) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&content, tag_field)?;
        manifest.path = Some(path.to_path_buf());
        Ok(manifest)
    }

    /// Parse a manifest from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the managed fields have the
    /// wrong type.
    pub fn parse(content: &str, tag_field: &str) -> Result<Self, ManifestError> {
        let document = match serde_json::from_str::<Value>(content)? {
            Value::Object(map) => map,
            _ => return Err(ManifestError::Shape("top level must be an object".to_string())),
        };

        let name = optional_string(&document, "name")?.unwrap_or_default();
        let compatibility_tag = optional_string(&document, tag_field)?.filter(|t| !t.is_empty());
        let version = optional_string(&document, "version")?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let dependencies: Vec<String> = match document.get("dependencies") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ManifestError::Shape(format!("dependency entries must be strings, got {item}"))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(ManifestError::Shape(format!(
                    "'dependencies' must be an array, got {other}"
                )))
            }
        };

        Ok(Self {
            path: None,
            document,
            package: ManifestPackage {
                name,
                compatibility_tag,
                version,
                dependencies,
            },
        })
    }

    /// Parse using the default compatibility tag field.
    ///
    /// # Errors
    ///
    /// See [`Manifest::parse`].
    pub fn parse_default(content: &str) -> Result<Self, ManifestError> {
        Self::parse(content, DEFAULT_TAG_FIELD)
    }

    /// The file this manifest was loaded from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The decoded package fields.
    #[must_use]
    pub fn package(&self) -> &ManifestPackage {
        &self.package
    }

    /// Replace the dependency list.
    pub fn set_dependencies(&mut self, dependencies: Vec<String>) {
        let had_key = self.document.contains_key("dependencies");
        if had_key || !dependencies.is_empty() {
            self.document.insert(
                "dependencies".to_string(),
                Value::Array(dependencies.iter().cloned().map(Value::String).collect()),
            );
        }
        self.package.dependencies = dependencies;
    }

    /// Replace the declared version.
    pub fn set_version(&mut self, version: &str) {
        self.document
            .insert("version".to_string(), Value::String(version.to_string()));
        self.package.version = Some(version.to_string());
    }

    /// Serialize as two-space indented JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(&self.document)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the manifest back to the file it was loaded from.
    ///
    /// The new content goes to a temporary file next to the manifest which
    /// then replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest has no path or cannot be written.
    pub fn write(&self) -> Result<(), ManifestError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| ManifestError::Shape("manifest was not loaded from a file".to_string()))?;
        self.write_to(path)
    }

    /// Write the manifest to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), ManifestError> {
        let write_err = |source: std::io::Error| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };
        let content = self
            .to_json_string()
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

fn optional_string(document: &Map<String, Value>, key: &str) -> Result<Option<String>, ManifestError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ManifestError::Shape(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}
