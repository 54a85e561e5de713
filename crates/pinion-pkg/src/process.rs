//! Processing one manifest start to finish.

use crate::bump::{decide_bump, BumpDecision, BumpInputs};
use crate::catalog::{ReleaseCandidate, ReleaseCatalog, DEFAULT_TAG_FIELD};
use crate::manifest::{Manifest, ManifestError};
use crate::pin::{DependencyUpdate, PinContext, PinMode, PinPolicy, ReservedNames};
use crate::select::select_best;
use std::path::{Path, PathBuf};

/// Flags for a pinning run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinOptions {
    /// Operator used for fresh pins.
    pub mode: PinMode,
    /// Persist changes; otherwise a dry run.
    pub write: bool,
    /// Re-pin dependencies that already carry a constraint.
    pub force: bool,
    /// Re-resolve already pinned dependencies with an eligible operator.
    pub upgrade: bool,
    /// Bump the package version even without another trigger.
    pub bump: bool,
}

/// What a pass over one manifest did.
#[derive(Debug, Clone)]
pub struct PinReport {
    /// Manifest file, if processed from disk.
    pub path: Option<PathBuf>,
    /// Per-dependency results in manifest order.
    pub dependencies: Vec<DependencyUpdate>,
    /// The package's own latest release, if the catalog knows it.
    pub remote_latest: Option<String>,
    /// Outcome of the version bump policy.
    pub bump: BumpDecision,
    /// The manifest differs from what was read.
    pub changed: bool,
    /// The manifest was written back.
    pub written: bool,
}

/// Pins manifests against a release catalog.
pub struct Pinner<C> {
    catalog: C,
    options: PinOptions,
    reserved: ReservedNames,
    tag_field: String,
}

impl<C: ReleaseCatalog> Pinner<C> {
    /// Create a pinner reserving only `base` and each manifest's own name.
    pub fn new(catalog: C, options: PinOptions) -> Self {
        Self {
            catalog,
            options,
            reserved: ReservedNames::new(),
            tag_field: DEFAULT_TAG_FIELD.to_string(),
        }
    }

    /// Use a different reserved name set.
    #[must_use]
    pub fn with_reserved(mut self, reserved: ReservedNames) -> Self {
        self.reserved = reserved;
        self
    }

    /// Read the compatibility tag from a different manifest field.
    #[must_use]
    pub fn with_tag_field(mut self, tag_field: impl Into<String>) -> Self {
        self.tag_field = tag_field.into();
        self
    }

    fn policy(&self) -> PinPolicy {
        PinPolicy::new(self.options.mode, self.reserved.clone())
            .with_force(self.options.force)
            .with_upgrade(self.options.upgrade)
    }

    /// Load, pin and (when requested and changed) write one manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded, its declared version
    /// cannot be bumped, or writing fails. Catalog failures are not errors.
    pub fn process_manifest(&self, path: &Path) -> Result<PinReport, ManifestError> {
        let mut manifest = Manifest::from_path(path, &self.tag_field)?;
        let mut report = self.process(&mut manifest)?;
        report.path = Some(path.to_path_buf());

        if report.changed && self.options.write {
            manifest.write()?;
            report.written = true;
        }
        Ok(report)
    }

    /// Pin an in-memory manifest; never writes.
    ///
    /// # Errors
    ///
    /// Returns an error if a bump is triggered and the declared version is not
    /// dotted numeric or would overflow.
    pub fn process(&self, manifest: &mut Manifest) -> Result<PinReport, ManifestError> {
        let package = manifest.package().clone();
        tracing::debug!(
            name = %package.name,
            dependencies = package.dependencies.len(),
            tag = package.compatibility_tag.as_deref().unwrap_or("none"),
            "processing manifest"
        );

        let ctx = PinContext {
            self_name: &package.name,
            want_tag: package.compatibility_tag.as_deref(),
        };
        let updates = self
            .policy()
            .pin_all(&package.dependencies, ctx, &self.catalog);

        let remote_latest = self.own_latest(&package.name, ctx.want_tag);
        let inputs = BumpInputs {
            dependencies_changed: updates.iter().any(DependencyUpdate::changed),
            latest_mismatch: updates.iter().any(DependencyUpdate::latest_mismatch),
            remote_latest: remote_latest.clone(),
            forced: self.options.bump,
        };
        let bump = decide_bump(package.version.as_deref(), &inputs)?;

        let mut changed = inputs.dependencies_changed;
        if changed {
            manifest.set_dependencies(updates.iter().map(|u| u.updated.clone()).collect());
        }
        if let BumpDecision::Bumped { ref from, ref to } = bump {
            tracing::info!(name = %package.name, %from, %to, "version bump");
            manifest.set_version(to);
            changed = true;
        }

        Ok(PinReport {
            path: None,
            dependencies: updates,
            remote_latest: remote_latest.map(|r| r.raw_version),
            bump,
            changed,
            written: false,
        })
    }

    /// The package's own latest release; lookup failures count as unknown.
    fn own_latest(&self, name: &str, want_tag: Option<&str>) -> Option<ReleaseCandidate> {
        if name.is_empty() {
            return None;
        }
        match self.catalog.fetch_releases(name) {
            Ok(releases) => select_best(&releases, want_tag).cloned(),
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to fetch own releases");
                None
            }
        }
    }
}
