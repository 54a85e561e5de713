//! Implementation of a pinning run over one or more manifests.

use anyhow::{Context, Result};
use pinion_pkg::{
    discover_manifests, BumpDecision, Config, DependencyOutcome, PinOptions, PinReport, Pinner,
    PortalClient, ReleaseCatalog,
};
use std::path::{Path, PathBuf};

/// Result of a run over every discovered manifest.
#[derive(Debug, Default)]
pub struct PinSummary {
    /// Manifests with changes (written or not).
    pub changed: Vec<PathBuf>,
    /// Manifests already up to date.
    pub unchanged: Vec<PathBuf>,
    /// Manifests that could not be processed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl PinSummary {
    /// Print the closing message for the run.
    pub fn print_summary(&self, write: bool) {
        if self.changed.is_empty() {
            println!("No changes (already pinned or no compatible releases found).");
        } else if !write {
            println!("\nDry run only. Re-run with --write to apply.");
        } else {
            println!("Updated {} manifest(s).", self.changed.len());
        }

        if !self.failed.is_empty() {
            eprintln!("{} manifest(s) failed:", self.failed.len());
            for (path, reason) in &self.failed {
                eprintln!("  {}: {reason}", path.display());
            }
        }
    }
}

/// Pin every manifest under `path` against the configured registry.
pub fn run(path: &Path, config: &Config, options: PinOptions) -> Result<PinSummary> {
    let manifests = discover_manifests(path, config.manifest_file())
        .with_context(|| format!("Failed to find manifests in {}", path.display()))?;
    tracing::debug!(count = manifests.len(), "discovered manifests");

    let client =
        PortalClient::with_config(config.portal_config()).context("Failed to create HTTP client")?;
    let pinner = Pinner::new(client, options)
        .with_reserved(config.reserved_names())
        .with_tag_field(config.tag_field());

    Ok(run_manifests(&pinner, &manifests))
}

/// Process each manifest in turn; a failure is recorded and the batch goes on.
pub fn run_manifests<C: ReleaseCatalog>(pinner: &Pinner<C>, manifests: &[PathBuf]) -> PinSummary {
    let mut summary = PinSummary::default();

    for path in manifests {
        match pinner.process_manifest(path) {
            Ok(report) => {
                for line in report_lines(path, &report) {
                    println!("{line}");
                }
                if report.changed {
                    summary.changed.push(path.clone());
                } else {
                    summary.unchanged.push(path.clone());
                }
            }
            Err(e) => {
                eprintln!("ERROR processing {}: {e}", path.display());
                summary.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    summary
}

/// Why an entry was left alone, for outcomes worth reporting.
fn skip_reason(outcome: &DependencyOutcome) -> Option<String> {
    match outcome {
        DependencyOutcome::Malformed => Some("skip unparsable dependency".to_string()),
        DependencyOutcome::AlreadyPinned => Some("skip already pinned".to_string()),
        DependencyOutcome::IneligibleOperator(op) => {
            Some(format!("skip upgrade of unsupported comparator {op}"))
        }
        DependencyOutcome::Unavailable(reason) => Some(format!("skip, lookup failed: {reason}")),
        DependencyOutcome::NoRelease => Some("skip no compatible releases".to_string()),
        DependencyOutcome::Reserved | DependencyOutcome::Resolved { .. } => None,
    }
}

/// Human-readable lines describing one manifest's changes.
fn report_lines(path: &Path, report: &PinReport) -> Vec<String> {
    let path = path.display();
    let mut lines = vec![format!(
        "{path}: processed {} dependencies",
        report.dependencies.len()
    )];

    for update in &report.dependencies {
        if update.changed() {
            lines.push(format!("{path}: {}  ->  {}", update.original, update.updated));
        } else if let Some(reason) = skip_reason(&update.outcome) {
            lines.push(format!("{path}: {}: {reason}", update.original));
        }
    }

    if let Some(ref remote) = report.remote_latest {
        lines.push(format!("{path}: remote_latest={remote}"));
    }

    match report.bump {
        BumpDecision::Bumped { ref from, ref to } => {
            lines.push(format!("{path}: version bump {from} -> {to}"));
        }
        BumpDecision::NoDeclaredVersion => {
            lines.push(format!("{path}: no declared version, skipping bump"));
        }
        BumpDecision::NotTriggered | BumpDecision::Unchanged => {}
    }

    if report.written {
        lines.push(format!("{path}: written"));
    }

    lines
}
