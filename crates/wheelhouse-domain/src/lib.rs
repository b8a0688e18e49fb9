#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod name;
pub mod requirements;
pub mod select;
pub mod tags;
pub mod wheel;
pub mod wishlist;

pub use name::normalize_dist_name;
pub use requirements::{parse_dependencies, Requirement, REQUIRES_DIST};
pub use select::{select_candidate, ArtifactListing, SelectedArtifact};
pub use tags::{
    CompatibilityTag, Implementation, TagSet, TargetEnvironment, TargetError, TargetSpec,
};
pub use wheel::{WheelFilename, WheelFilenameError, WHEEL_EXTENSION};
pub use wishlist::{parse_wishlist, DEFAULT_WISHLIST};
