use std::str::FromStr;

use pep508_rs::{MarkerEnvironment, Requirement as PepRequirement};
use serde::Serialize;
use tracing::debug;

use crate::name::normalize_dist_name;

/// Header that declares one runtime dependency in a dist-info `METADATA` file.
pub const REQUIRES_DIST: &str = "Requires-Dist";

/// A dependency declaration that applies to the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub normalized: String,
    pub marker: Option<String>,
    pub raw: String,
}

/// Extract the dependencies from a `METADATA` document whose markers hold
/// for `markers`.
///
/// Only the RFC 822 header block is scanned; it ends at the first blank line.
/// Extras are never active, so `extra == "..."` dependencies are dropped.
/// Output keeps manifest order and is not de-duplicated.
pub fn parse_dependencies(manifest: &str, markers: &MarkerEnvironment) -> Vec<Requirement> {
    let mut requirements = Vec::new();
    for line in manifest.lines() {
        if line.trim().is_empty() {
            break;
        }
        let Some(raw) = requires_dist_value(line) else {
            continue;
        };
        let parsed = match PepRequirement::from_str(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(requirement = raw, %err, "skipping unparseable requirement");
                continue;
            }
        };
        if !parsed.evaluate_markers(markers, &[]) {
            debug!(requirement = raw, "marker does not apply to target");
            continue;
        }
        let name = parsed.name.to_string();
        requirements.push(Requirement {
            normalized: normalize_dist_name(&name),
            name,
            marker: parsed.marker.as_ref().map(ToString::to_string),
            raw: raw.to_string(),
        });
    }
    requirements
}

fn requires_dist_value(line: &str) -> Option<&str> {
    let (key, value) = line.split_once(':')?;
    if !key.trim_end().eq_ignore_ascii_case(REQUIRES_DIST) {
        return None;
    }
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
