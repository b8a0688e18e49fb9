use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tags::TagSet;
use crate::wheel::{has_wheel_extension, WheelFilename};

/// One file entry from a package index listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactListing {
    pub filename: String,
    pub url: String,
}

impl ArtifactListing {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

/// The listing judged best for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedArtifact {
    pub listing: ArtifactListing,
    pub wheel: WheelFilename,
}

/// Pick the highest-version wheel whose tags intersect `tags`.
///
/// Version decides the winner, not tag specificity; at equal versions the
/// listing seen first is kept.
pub fn select_candidate(listings: &[ArtifactListing], tags: &TagSet) -> Option<SelectedArtifact> {
    let mut best: Option<SelectedArtifact> = None;
    for listing in listings {
        if !has_wheel_extension(&listing.filename) {
            continue;
        }
        let wheel = match listing.filename.parse::<WheelFilename>() {
            Ok(wheel) => wheel,
            Err(err) => {
                debug!(%err, "skipping non-conforming wheel filename");
                continue;
            }
        };
        if !tags.intersects(&wheel.tags) {
            continue;
        }
        let replace = best
            .as_ref()
            .is_none_or(|current| wheel.version > current.wheel.version);
        if replace {
            best = Some(SelectedArtifact {
                listing: listing.clone(),
                wheel,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TargetSpec;

    fn linux_tags() -> TagSet {
        TargetSpec::parse("manylinux_2_17_x86_64", "311", "cp")
            .unwrap()
            .tags()
    }

    fn listing(filename: &str) -> ArtifactListing {
        ArtifactListing::new(filename, format!("https://files.example/{filename}"))
    }

    fn selected_filename(listings: &[ArtifactListing]) -> Option<String> {
        select_candidate(listings, &linux_tags()).map(|selected| selected.listing.filename)
    }

    #[test]
    fn tag_compatibility_dominates_version() {
        let listings = vec![
            listing("demo-1.0.0-cp311-cp311-manylinux_2_17_x86_64.whl"),
            listing("demo-2.0.0-cp312-cp312-win_amd64.whl"),
        ];
        assert_eq!(
            selected_filename(&listings).as_deref(),
            Some("demo-1.0.0-cp311-cp311-manylinux_2_17_x86_64.whl")
        );
    }

    #[test]
    fn highest_compatible_version_wins_in_any_order() {
        let mut listings = vec![
            listing("demo-1.9.0-py3-none-any.whl"),
            listing("demo-1.10.0-cp311-abi3-manylinux_2_17_x86_64.whl"),
            listing("demo-1.2.0-cp311-cp311-manylinux_2_17_x86_64.whl"),
            listing("demo-3.0.0.tar.gz"),
        ];
        let expected = Some("demo-1.10.0-cp311-abi3-manylinux_2_17_x86_64.whl".to_string());
        assert_eq!(selected_filename(&listings), expected);
        listings.reverse();
        assert_eq!(selected_filename(&listings), expected);
        listings.rotate_left(1);
        assert_eq!(selected_filename(&listings), expected);
    }

    #[test]
    fn first_seen_wins_at_equal_version() {
        let listings = vec![
            listing("demo-1.0.0-py3-none-any.whl"),
            listing("demo-1.0.0-cp311-cp311-manylinux_2_17_x86_64.whl"),
        ];
        assert_eq!(
            selected_filename(&listings).as_deref(),
            Some("demo-1.0.0-py3-none-any.whl")
        );
    }

    #[test]
    fn malformed_and_incompatible_listings_yield_none() {
        let listings = vec![
            listing("demo-1.0.0.zip"),
            listing("demo-bad-version!-py3-none-any.whl"),
            listing("demo-1.0.0-cp39-cp39-macosx_11_0_arm64.whl"),
        ];
        assert_eq!(selected_filename(&listings), None);
        assert_eq!(selected_filename(&[]), None);
    }
}
