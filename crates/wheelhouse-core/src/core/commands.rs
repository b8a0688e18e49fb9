use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use wheelhouse_domain::{parse_wishlist, TargetEnvironment, DEFAULT_WISHLIST};

use crate::config::context::CommandContext;
use crate::mirror::{install_hint, MirrorBuilder, MirrorOptions};
use crate::outcome::{ExecutionOutcome, UserError};
use crate::progress::ProgressReporter;
use crate::resolver::{Resolution, Resolver};

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub platform: String,
    pub python: String,
    pub implementation: String,
    /// Command-line packages; when non-empty they replace the wishlist file.
    pub packages: Vec<String>,
    pub wishlist: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub resolve: ResolveRequest,
    pub output: PathBuf,
    pub dry_run: bool,
}

/// Resolve the wishlist to the closed set of wheel URLs for the target.
///
/// # Errors
/// Returns an error if the target is invalid or the wishlist cannot be read.
pub fn resolve_packages(
    ctx: &CommandContext,
    request: &ResolveRequest,
) -> Result<ExecutionOutcome> {
    let target = target_environment(request)?;
    let wishlist = load_wishlist(request, true)?;
    let resolution = run_resolution(ctx, &target, &wishlist);

    let message = format!(
        "resolved {} wheel(s) from {} requested package(s)",
        resolution.urls.len(),
        wishlist.len()
    );
    let mut details = resolution_details(&target, &wishlist, &resolution);
    if resolution.urls.is_empty() {
        details["hint"] = json!("check the package names and the --platform/--python target");
    }
    Ok(ExecutionOutcome::completed(
        message,
        details,
        resolution.diagnostics.len(),
    ))
}

/// Resolve the wishlist, then download every wheel into a PEP 503 mirror.
///
/// # Errors
/// Returns an error if the target is invalid, the wishlist cannot be read,
/// or the mirror directory cannot be written.
pub fn build_mirror(ctx: &CommandContext, request: &MirrorRequest) -> Result<ExecutionOutcome> {
    let target = target_environment(&request.resolve)?;
    let wishlist = load_wishlist(&request.resolve, !request.dry_run)?;
    let resolution = run_resolution(ctx, &target, &wishlist);

    let options = MirrorOptions {
        root: request.output.clone(),
        dry_run: request.dry_run,
        workers: ctx.config().mirror().download_workers,
        stale_after: ctx.config().mirror().stale_claim_after,
    };
    let mut summary =
        MirrorBuilder::new(ctx.downloader(), options).build(&resolution.artifacts)?;
    if let Some(first) = wishlist.first() {
        summary.hint = install_hint(&summary.root, first);
    }

    let message = if request.dry_run {
        format!(
            "would mirror {} wheel(s) into {} ({} already present)",
            summary.artifacts.len() - summary.cached,
            summary.root.display(),
            summary.cached
        )
    } else {
        format!(
            "mirrored {} wheel(s) into {} ({} fetched, {} cached, {} failed)",
            summary.fetched + summary.cached,
            summary.root.display(),
            summary.fetched,
            summary.cached,
            summary.failed
        )
    };
    info!(
        fetched = summary.fetched,
        cached = summary.cached,
        failed = summary.failed,
        bytes = summary.bytes_fetched,
        "mirror complete"
    );

    let mut details = resolution_details(&target, &wishlist, &resolution);
    details["hint"] = json!(summary.hint.clone());
    details["mirror"] = serde_json::to_value(&summary)?;
    let warnings = resolution.diagnostics.len() + summary.failed + summary.skipped;
    Ok(ExecutionOutcome::completed(message, details, warnings))
}

fn target_environment(request: &ResolveRequest) -> Result<TargetEnvironment> {
    TargetEnvironment::build(&request.platform, &request.python, &request.implementation).map_err(
        |err| {
            UserError::new(
                "invalid_target",
                err.to_string(),
                json!({
                    "platform": request.platform,
                    "python": request.python,
                    "implementation": request.implementation,
                    "hint": "use e.g. --platform manylinux_2_17_x86_64 --python 311 --implementation cp",
                }),
            )
            .into()
        },
    )
}

/// Packages named on the command line win; otherwise read the wishlist file,
/// seeding it with the default list when it does not exist yet.
fn load_wishlist(request: &ResolveRequest, seed_missing: bool) -> Result<Vec<String>> {
    let entries = if request.packages.is_empty() {
        parse_wishlist(&read_wishlist(&request.wishlist, seed_missing)?)
    } else {
        request
            .packages
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    };
    if entries.is_empty() {
        return Err(UserError::new(
            "empty_wishlist",
            "nothing to resolve",
            json!({
                "wishlist": request.wishlist.display().to_string(),
                "hint": "list one package per line in the wishlist or pass package names",
            }),
        )
        .into());
    }
    Ok(entries)
}

fn read_wishlist(path: &Path, seed_missing: bool) -> Result<String> {
    if path.exists() {
        return fs_err::read_to_string(path)
            .with_context(|| format!("failed to read wishlist {}", path.display()));
    }
    warn!(
        path = %path.display(),
        "wishlist not found; using the default list ({})",
        parse_wishlist(DEFAULT_WISHLIST).join(", ")
    );
    if seed_missing {
        fs_err::write(path, DEFAULT_WISHLIST)
            .with_context(|| format!("failed to write default wishlist {}", path.display()))?;
    }
    Ok(DEFAULT_WISHLIST.to_string())
}

fn run_resolution(
    ctx: &CommandContext,
    target: &TargetEnvironment,
    wishlist: &[String],
) -> Resolution {
    info!(
        platform = %target.spec.platform,
        python = %target.spec.python_version,
        implementation = %target.spec.implementation,
        packages = wishlist.len(),
        "resolving"
    );
    let spinner = ProgressReporter::spinner("resolving dependencies");
    let resolution = Resolver::new(ctx.index(), ctx.metadata(), target)
        .with_progress(&spinner)
        .resolve_all(wishlist);
    spinner.finish(format!(
        "resolved {} package(s), {} warning(s)",
        resolution.resolved_count(),
        resolution.diagnostics.len()
    ));
    resolution
}

fn resolution_details(
    target: &TargetEnvironment,
    wishlist: &[String],
    resolution: &Resolution,
) -> Value {
    json!({
        "target": {
            "platform": target.spec.platform,
            "python": target.spec.python_version,
            "implementation": target.spec.implementation,
            "tags": target.tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
        },
        "wishlist": wishlist,
        "urls": resolution.urls,
        "packages": resolution.packages,
        "diagnostics": resolution.diagnostics,
    })
}
