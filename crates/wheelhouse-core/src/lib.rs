#![deny(clippy::all)]

mod core;

pub(crate) use crate::core::tooling::{outcome, progress};
pub(crate) use crate::core::{config, mirror, net, resolver, runtime, store};

pub use crate::core::commands::{build_mirror, resolve_packages, MirrorRequest, ResolveRequest};
pub use crate::core::config::context::{CommandContext, CommandInfo};
pub use crate::core::config::{Config, MirrorConfig, NetworkConfig};
pub use crate::core::mirror::{
    render_package_page, render_root_page, MirrorBuilder, MirrorOptions, MirrorSummary,
};
pub use crate::core::resolver::{
    resolve_wishlist, Diagnostic, DiagnosticKind, PackageReport, PackageStatus, Resolution,
    Resolver,
};
pub use crate::core::runtime::effects::{
    ArtifactDownloader, Effects, MetadataSource, PackageIndex, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::{format_status_message, to_json_response, CommandGroup};
pub use crate::core::store::index::{IndexError, SimpleIndexClient, SIMPLE_JSON_ACCEPT};
pub use crate::core::store::metadata::{
    extract_metadata, HttpMetadataFetcher, MetadataError, METADATA_SUFFIX,
};
pub use crate::core::store::HttpDownloader;
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome, UserError};
pub use crate::core::tooling::progress::ProgressReporter;
