//! Pin policy: deciding what to write for each dependency.
//!
//! For every declarator, in manifest order, the policy either passes the
//! entry through untouched or resolves it against the catalog and rewrites
//! its constraint.

use crate::catalog::ReleaseCatalog;
use crate::declarator::{Constraint, Declarator, Operator};
use crate::select::select_best;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// The engine package every mod implicitly depends on.
pub const BASE_PACKAGE: &str = "base";

/// How newly pinned constraints are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    /// `>= major.minor` of the latest release.
    #[default]
    Gte,
    /// `== latest` exactly.
    Eq,
}

impl PinMode {
    /// Returns the mode as written on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Eq => "eq",
        }
    }

    /// The operator used for a fresh pin.
    #[must_use]
    pub fn operator(&self) -> Operator {
        match self {
            Self::Gte => Operator::AtLeast,
            Self::Eq => Operator::Exact,
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names that are never looked up in the catalog.
///
/// Always contains [`BASE_PACKAGE`]; the manifest's own name is checked per
/// call.
#[derive(Debug, Clone)]
pub struct ReservedNames {
    names: BTreeSet<String>,
}

impl ReservedNames {
    /// Only `base` is reserved.
    #[must_use]
    pub fn new() -> Self {
        let mut names = BTreeSet::new();
        names.insert(BASE_PACKAGE.to_string());
        Self { names }
    }

    /// Also reserve packages that live next to the manifest being pinned.
    #[must_use]
    pub fn with_local_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(packages.into_iter().map(Into::into));
        self
    }

    /// Returns true if `name` must pass through for a manifest named `self_name`.
    #[must_use]
    pub fn contains(&self, name: &str, self_name: &str) -> bool {
        name == self_name || self.names.contains(name)
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    /// The entry could not be parsed and was kept verbatim.
    Malformed,
    /// `base`, the manifest itself, or a local package.
    Reserved,
    /// Already constrained and neither force nor upgrade was requested.
    AlreadyPinned,
    /// Upgrade requested but the operator is not eligible.
    IneligibleOperator(Operator),
    /// The catalog could not be queried.
    Unavailable(String),
    /// The catalog has no usable release.
    NoRelease,
    /// Resolved against the catalog; the entry may or may not have changed.
    Resolved {
        /// Latest release selected.
        latest: String,
        /// The previous constraint named a version other than `latest`.
        latest_mismatch: bool,
    },
}

/// The result of pinning one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpdate {
    /// Entry as read from the manifest.
    pub original: String,
    /// Entry to write back.
    pub updated: String,
    /// Why `updated` looks the way it does.
    pub outcome: DependencyOutcome,
}

impl DependencyUpdate {
    fn unchanged(raw: &str, outcome: DependencyOutcome) -> Self {
        Self {
            original: raw.to_string(),
            updated: raw.to_string(),
            outcome,
        }
    }

    /// Returns true if the entry text differs from what was read.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.original != self.updated
    }

    /// Returns true if the resolved release differs from the previous pin.
    #[must_use]
    pub fn latest_mismatch(&self) -> bool {
        matches!(
            self.outcome,
            DependencyOutcome::Resolved {
                latest_mismatch: true,
                ..
            }
        )
    }
}

/// Manifest-level facts the policy needs for each dependency.
#[derive(Debug, Clone, Copy)]
pub struct PinContext<'a> {
    /// The manifest's own package name.
    pub self_name: &'a str,
    /// The manifest's compatibility tag.
    pub want_tag: Option<&'a str>,
}

/// Rewrite rules for dependency constraints.
#[derive(Debug, Clone, Default)]
pub struct PinPolicy {
    /// Operator used for fresh pins.
    pub mode: PinMode,
    /// Re-pin entries that already carry a constraint.
    pub force: bool,
    /// Re-resolve already pinned entries with an eligible operator.
    pub upgrade: bool,
    /// Names never resolved.
    pub reserved: ReservedNames,
}

impl PinPolicy {
    /// Create a policy with the given mode and no flags.
    #[must_use]
    pub fn new(mode: PinMode, reserved: ReservedNames) -> Self {
        Self {
            mode,
            force: false,
            upgrade: false,
            reserved,
        }
    }

    /// Set the force flag.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the upgrade flag.
    #[must_use]
    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Pin every entry of a dependency list, preserving order.
    pub fn pin_all<C: ReleaseCatalog>(
        &self,
        dependencies: &[String],
        ctx: PinContext<'_>,
        catalog: &C,
    ) -> Vec<DependencyUpdate> {
        dependencies
            .iter()
            .map(|raw| self.pin(raw, ctx, catalog))
            .collect()
    }

    /// Pin a single entry.
    pub fn pin<C: ReleaseCatalog>(
        &self,
        raw: &str,
        ctx: PinContext<'_>,
        catalog: &C,
    ) -> DependencyUpdate {
        let declarator = match Declarator::parse(raw) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "keeping unparsable dependency");
                return DependencyUpdate::unchanged(raw, DependencyOutcome::Malformed);
            }
        };
        let name = declarator.name();

        if self.reserved.contains(name, ctx.self_name) {
            tracing::debug!(name, "skip local/base/self");
            return DependencyUpdate::unchanged(raw, DependencyOutcome::Reserved);
        }

        let prior = declarator.constraint();
        if let Some(c) = prior {
            if !(self.force || self.upgrade) {
                tracing::debug!(name, op = %c.op, version = %c.version, "skip already pinned");
                return DependencyUpdate::unchanged(raw, DependencyOutcome::AlreadyPinned);
            }
            if self.upgrade && !self.force && !c.op.is_upgradable() {
                tracing::debug!(name, op = %c.op, "skip upgrade of unsupported comparator");
                return DependencyUpdate::unchanged(
                    raw,
                    DependencyOutcome::IneligibleOperator(c.op),
                );
            }
        }

        let releases = match catalog.fetch_releases(name) {
            Ok(releases) => releases,
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to fetch releases");
                return DependencyUpdate::unchanged(
                    raw,
                    DependencyOutcome::Unavailable(e.to_string()),
                );
            }
        };
        let Some(best) = select_best(&releases, ctx.want_tag) else {
            tracing::info!(name, "no compatible releases");
            return DependencyUpdate::unchanged(raw, DependencyOutcome::NoRelease);
        };
        let latest = best.raw_version.as_str();

        let op = match prior {
            Some(c) if !self.force => c.op,
            _ => self.mode.operator(),
        };
        let version = if op == Operator::AtLeast {
            let keep_patch = self.upgrade && prior.is_some_and(|c| c.arity() >= 3);
            if keep_patch {
                latest.to_string()
            } else {
                major_minor(latest)
            }
        } else {
            latest.to_string()
        };

        let updated = declarator
            .with_constraint(Constraint::new(op, version))
            .serialize();
        if updated != raw {
            tracing::info!(from = raw, to = %updated, "dependency pinned");
        }

        DependencyUpdate {
            original: raw.to_string(),
            updated,
            outcome: DependencyOutcome::Resolved {
                latest: latest.to_string(),
                latest_mismatch: prior.is_some_and(|c| c.version != latest),
            },
        }
    }
}

/// The first two components of a dotted version.
fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    const CTX: PinContext<'static> = PinContext {
        self_name: "my-pack",
        want_tag: Some("2.0"),
    };

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_release("foo", "3.4.1", Some("2.0"))
            .with_release("foo", "3.3.0", Some("2.0"))
            .with_release("legacy", "9.0.0", Some("1.1"))
            .with_release("legacy", "1.5.2", Some("2.0"))
    }

    fn pin(policy: &PinPolicy, raw: &str) -> DependencyUpdate {
        policy.pin(raw, CTX, &catalog())
    }

    #[test]
    fn test_fresh_gte_pin_uses_major_minor() {
        let policy = PinPolicy::default();
        let update = pin(&policy, "foo");
        assert_eq!(update.updated, "foo >= 3.4");
        assert!(update.changed());
        assert!(!update.latest_mismatch());
    }

    #[test]
    fn test_fresh_eq_pin_uses_full_version() {
        let policy = PinPolicy::new(PinMode::Eq, ReservedNames::new());
        assert_eq!(pin(&policy, "? foo").updated, "? foo == 3.4.1");
    }

    #[test]
    fn test_flag_is_preserved() {
        let policy = PinPolicy::default();
        assert_eq!(pin(&policy, "!foo").updated, "! foo >= 3.4");
    }

    #[test]
    fn test_compatibility_tag_picks_release() {
        let policy = PinPolicy::default();
        assert_eq!(pin(&policy, "legacy").updated, "legacy >= 1.5");
    }

    #[test]
    fn test_reserved_names_never_touch_catalog() {
        let catalog = MemoryCatalog::new()
            .with_release("base", "2.0.0", None)
            .with_release("my-pack", "1.0.0", None)
            .with_release("sibling", "1.0.0", None);
        let policy = PinPolicy::new(
            PinMode::Eq,
            ReservedNames::new().with_local_packages(["sibling"]),
        )
        .with_force(true)
        .with_upgrade(true);

        for raw in ["base", "my-pack >= 0.1", "? sibling", "base >= 1.0"] {
            let update = policy.pin(raw, CTX, &catalog);
            assert_eq!(update.updated, raw);
            assert_eq!(update.outcome, DependencyOutcome::Reserved);
        }
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_existing_constraint_kept_without_flags() {
        let catalog = catalog();
        let update = PinPolicy::default().pin("foo >= 1.0.0", CTX, &catalog);
        assert_eq!(update.updated, "foo >= 1.0.0");
        assert_eq!(update.outcome, DependencyOutcome::AlreadyPinned);
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_upgrade_skips_ineligible_operator() {
        let policy = PinPolicy::default().with_upgrade(true);
        for (raw, op) in [("foo ~> 1.0", Operator::Pessimistic), ("foo <= 4.0", Operator::AtMost)] {
            let update = pin(&policy, raw);
            assert_eq!(update.updated, raw);
            assert_eq!(update.outcome, DependencyOutcome::IneligibleOperator(op));
        }
    }

    #[test]
    fn test_force_overrides_ineligible_operator() {
        let policy = PinPolicy::default().with_upgrade(true).with_force(true);
        assert_eq!(pin(&policy, "foo ~> 1.0").updated, "foo >= 3.4");
    }

    #[test]
    fn test_upgrade_keeps_existing_operator() {
        let policy = PinPolicy::new(PinMode::Gte, ReservedNames::new()).with_upgrade(true);
        assert_eq!(pin(&policy, "foo == 3.0.0").updated, "foo == 3.4.1");
        assert_eq!(pin(&policy, "foo = 3.0").updated, "foo = 3.4.1");
    }

    #[test]
    fn test_upgrade_of_patch_pin_keeps_patch_granularity() {
        let policy = PinPolicy::default().with_upgrade(true);
        let update = pin(&policy, "foo >= 3.3.0");
        assert_eq!(update.updated, "foo >= 3.4.1");
        assert!(update.latest_mismatch());
    }

    #[test]
    fn test_upgrade_of_two_component_pin_stays_major_minor() {
        let policy = PinPolicy::default().with_upgrade(true);
        let update = pin(&policy, "foo >= 3.3");
        assert_eq!(update.updated, "foo >= 3.4");
        assert!(update.latest_mismatch());
    }

    #[test]
    fn test_force_repins_version_beyond_u64() {
        let update = pin(
            &PinPolicy::default().with_force(true),
            "foo >= 99999999999999999999999",
        );
        assert_eq!(update.updated, "foo >= 3.4");
        assert!(update.latest_mismatch());
    }

    #[test]
    fn test_force_in_eq_mode_replaces_operator() {
        let policy = PinPolicy::new(PinMode::Eq, ReservedNames::new()).with_force(true);
        assert_eq!(pin(&policy, "foo >= 1.0").updated, "foo == 3.4.1");
    }

    #[test]
    fn test_up_to_date_pin_is_unchanged() {
        let policy = PinPolicy::default().with_upgrade(true);
        let update = pin(&policy, "foo >= 3.4.1");
        assert!(!update.changed());
        assert!(!update.latest_mismatch());
    }

    #[test]
    fn test_latest_mismatch_without_text_change() {
        // `>= 3.4` already matches major.minor of 3.4.1 but names another version.
        let policy = PinPolicy::default().with_upgrade(true);
        let update = pin(&policy, "foo >= 3.4");
        assert!(!update.changed());
        assert!(update.latest_mismatch());
    }

    #[test]
    fn test_missing_and_unavailable_releases_leave_entry() {
        let catalog = MemoryCatalog::new().with_unavailable("down");
        let policy = PinPolicy::default();

        let update = policy.pin("ghost", CTX, &catalog);
        assert_eq!(update.outcome, DependencyOutcome::NoRelease);
        assert!(!update.changed());

        let update = policy.pin("down", CTX, &catalog);
        assert!(matches!(update.outcome, DependencyOutcome::Unavailable(_)));
        assert!(!update.changed());
    }

    #[test]
    fn test_malformed_entry_is_kept_verbatim() {
        let update = pin(&PinPolicy::default(), "foo bar baz");
        assert_eq!(update.updated, "foo bar baz");
        assert_eq!(update.outcome, DependencyOutcome::Malformed);
    }

    #[test]
    fn test_pin_all_preserves_order() {
        let deps: Vec<String> = ["base", "legacy", "foo"].map(String::from).to_vec();
        let updates = PinPolicy::default().pin_all(&deps, CTX, &catalog());
        let out: Vec<_> = updates.iter().map(|u| u.updated.as_str()).collect();
        assert_eq!(out, vec!["base", "legacy >= 1.5", "foo >= 3.4"]);
    }
}
