//! Dependency walk from wishlist entries to a closed set of wheel URLs.
//!
//! The walk is depth-first pre-order over an explicit frontier. A single
//! [`Resolver`] owns the visited set for the whole run, so every package is
//! looked up at most once no matter how many parents reach it. Failures are
//! recorded as [`Diagnostic`] values and never abort sibling branches.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use wheelhouse_domain::{
    normalize_dist_name, parse_dependencies, select_candidate, ArtifactListing, TargetEnvironment,
};

use crate::progress::ProgressReporter;
use crate::runtime::effects::{MetadataSource, PackageIndex};
use crate::store::index::IndexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    NotFound,
    TransportFailure,
    NoCompatibleArtifact,
    MetadataUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub package: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackageStatus {
    Resolved {
        filename: String,
        version: String,
        url: String,
        dependencies: Vec<String>,
    },
    NotFound,
    LookupFailed,
    NoCompatible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub name: String,
    #[serde(flatten)]
    pub status: PackageStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Distinct artifact URLs in first-discovery order.
    pub urls: Vec<String>,
    /// The index listings behind `urls`, in the same order.
    pub artifacts: Vec<ArtifactListing>,
    pub packages: Vec<PackageReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.packages
            .iter()
            .filter(|report| matches!(report.status, PackageStatus::Resolved { .. }))
            .count()
    }
}

pub struct Resolver<'a> {
    index: &'a dyn PackageIndex,
    metadata: &'a dyn MetadataSource,
    target: &'a TargetEnvironment,
    progress: Option<&'a ProgressReporter>,
    visited: IndexSet<String>,
    artifacts: Vec<ArtifactListing>,
    reports: Vec<PackageReport>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(
        index: &'a dyn PackageIndex,
        metadata: &'a dyn MetadataSource,
        target: &'a TargetEnvironment,
    ) -> Self {
        Self {
            index,
            metadata,
            target,
            progress: None,
            visited: IndexSet::new(),
            artifacts: Vec::new(),
            reports: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolve `name` and everything it pulls in that this resolver has not
    /// seen yet. Returns the URLs newly discovered by this call, which is
    /// empty when the package was already reached.
    pub fn resolve(&mut self, name: &str) -> Vec<String> {
        let mut discovered = Vec::new();
        let mut frontier = vec![name.to_string()];
        while let Some(next) = frontier.pop() {
            let normalized = normalize_dist_name(&next);
            if normalized.is_empty() || !self.visited.insert(normalized.clone()) {
                continue;
            }
            info!(package = %normalized, "inspecting");
            if let Some(progress) = self.progress {
                progress.set_label(format!("resolving {normalized}"));
            }
            if let Some((listing, dependencies)) = self.visit(&next, &normalized) {
                discovered.push(listing.url.clone());
                self.artifacts.push(listing);
                frontier.extend(dependencies.into_iter().rev());
            }
        }
        discovered
    }

    /// Resolve every wishlist entry in order and close the run.
    pub fn resolve_all(mut self, wishlist: &[String]) -> Resolution {
        for entry in wishlist {
            if self.visited.contains(&normalize_dist_name(entry)) {
                debug!(package = %entry, "already covered by an earlier entry");
                continue;
            }
            self.resolve(entry);
        }
        self.finish()
    }

    #[must_use]
    pub fn finish(self) -> Resolution {
        let mut by_url: IndexMap<String, ArtifactListing> = IndexMap::new();
        for listing in self.artifacts {
            by_url.entry(listing.url.clone()).or_insert(listing);
        }
        let artifacts: Vec<ArtifactListing> = by_url.into_values().collect();
        Resolution {
            urls: artifacts.iter().map(|listing| listing.url.clone()).collect(),
            artifacts,
            packages: self.reports,
            diagnostics: self.diagnostics,
        }
    }

    fn visit(&mut self, name: &str, normalized: &str) -> Option<(ArtifactListing, Vec<String>)> {
        let listings = match self.index.list_artifacts(name) {
            Ok(listings) => listings,
            Err(err) => {
                let (kind, status) = match err {
                    IndexError::NotFound { .. } => {
                        (DiagnosticKind::NotFound, PackageStatus::NotFound)
                    }
                    IndexError::Transport { .. } => {
                        (DiagnosticKind::TransportFailure, PackageStatus::LookupFailed)
                    }
                };
                self.diagnose(normalized, kind, err.to_string());
                self.report(normalized, status);
                return None;
            }
        };

        let Some(selected) = select_candidate(&listings, &self.target.tags) else {
            let wanted = self
                .target
                .tags
                .most_specific()
                .map_or_else(String::new, ToString::to_string);
            self.diagnose(
                normalized,
                DiagnosticKind::NoCompatibleArtifact,
                format!(
                    "none of {} listed files is a wheel compatible with {wanted}",
                    listings.len()
                ),
            );
            self.report(normalized, PackageStatus::NoCompatible);
            return None;
        };

        let url = selected.listing.url.clone();
        let requirements = match self.metadata.fetch_metadata(&url) {
            Ok(manifest) => parse_dependencies(&manifest, &self.target.markers),
            Err(err) => {
                self.diagnose(
                    normalized,
                    DiagnosticKind::MetadataUnavailable,
                    format!("{}: {err}", selected.listing.filename),
                );
                Vec::new()
            }
        };
        let dependencies: Vec<String> = requirements
            .into_iter()
            .map(|requirement| requirement.name)
            .collect();
        debug!(package = %normalized, ?dependencies, "dependencies");

        self.report(
            normalized,
            PackageStatus::Resolved {
                filename: selected.listing.filename.clone(),
                version: selected.wheel.version.to_string(),
                url,
                dependencies: dependencies
                    .iter()
                    .map(|name| normalize_dist_name(name))
                    .collect(),
            },
        );
        Some((selected.listing, dependencies))
    }

    fn diagnose(&mut self, package: &str, kind: DiagnosticKind, message: String) {
        warn!(package, ?kind, "{message}");
        self.diagnostics.push(Diagnostic {
            package: package.to_string(),
            kind,
            message,
        });
    }

    fn report(&mut self, name: &str, status: PackageStatus) {
        self.reports.push(PackageReport {
            name: name.to_string(),
            status,
        });
    }
}

/// One-shot resolution of a whole wishlist with a fresh visited set.
pub fn resolve_wishlist(
    index: &dyn PackageIndex,
    metadata: &dyn MetadataSource,
    target: &TargetEnvironment,
    wishlist: &[String],
) -> Resolution {
    Resolver::new(index, metadata, target).resolve_all(wishlist)
}
