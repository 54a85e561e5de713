//! Patch bumps of a package's own version.

use crate::catalog::ReleaseCandidate;
use crate::version::{VersionError, VersionTuple};

/// What can trigger a bump after the dependencies have been processed.
#[derive(Debug, Clone, Default)]
pub struct BumpInputs {
    /// At least one dependency entry was rewritten.
    pub dependencies_changed: bool,
    /// At least one resolved release differs from the version previously pinned.
    pub latest_mismatch: bool,
    /// The package's own latest release in the catalog, if any.
    pub remote_latest: Option<ReleaseCandidate>,
    /// Bump even without any other trigger.
    pub forced: bool,
}

/// Outcome of the bump policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpDecision {
    /// Nothing asked for a bump.
    NotTriggered,
    /// A bump was asked for but the manifest declares no version.
    NoDeclaredVersion,
    /// The computed version equals the declared one.
    Unchanged,
    /// The declared version must be replaced.
    Bumped { from: String, to: String },
}

impl BumpDecision {
    /// The new version, if one must be written.
    #[must_use]
    pub fn new_version(&self) -> Option<&str> {
        match self {
            Self::Bumped { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// `max(local, remote)` with the patch component incremented.
///
/// # Errors
///
/// Returns [`VersionError::Overflow`] if the base version does not fit in
/// `u64` components or its patch is already `u64::MAX`.
pub fn bump_patch(
    local: &VersionTuple,
    remote: Option<&VersionTuple>,
) -> Result<semver::Version, VersionError> {
    let base = match remote {
        Some(remote) if remote > local => remote,
        _ => local,
    };
    let base_semver = base.canonical()?;
    let patch = base_semver
        .patch
        .checked_add(1)
        .ok_or_else(|| VersionError::Overflow(base.to_string()))?;
    Ok(semver::Version::new(base_semver.major, base_semver.minor, patch))
}

/// Decide whether `declared` must be bumped.
///
/// # Errors
///
/// Returns an error if a bump is triggered and the declared version is not
/// dotted numeric, or cannot be bumped without overflowing.
pub fn decide_bump(declared: Option<&str>, inputs: &BumpInputs) -> Result<BumpDecision, VersionError> {
    let declared = declared.map(str::trim).filter(|v| !v.is_empty());

    let remote_mismatch = match (&inputs.remote_latest, declared) {
        (Some(remote), Some(local)) => remote.raw_version != local,
        _ => false,
    };
    let triggered =
        inputs.forced || inputs.dependencies_changed || inputs.latest_mismatch || remote_mismatch;
    if !triggered {
        return Ok(BumpDecision::NotTriggered);
    }

    let Some(declared) = declared else {
        return Ok(BumpDecision::NoDeclaredVersion);
    };

    let local = VersionTuple::parse(declared)?;
    let next = bump_patch(&local, inputs.remote_latest.as_ref().map(|r| &r.version))?.to_string();
    if next == declared {
        return Ok(BumpDecision::Unchanged);
    }
    Ok(BumpDecision::Bumped {
        from: declared.to_string(),
        to: next,
    })
}
