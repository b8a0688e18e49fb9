use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::runtime::effects::{
    ArtifactDownloader, Effects, MetadataSource, PackageIndex, SharedEffects, SystemEffects,
};
use crate::runtime::CommandGroup;

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

/// Configuration plus the index, metadata and download effects a command
/// runs against.
pub struct CommandContext {
    config: Config,
    effects: SharedEffects,
}

impl CommandContext {
    /// Creates a context backed by the real index and network.
    ///
    /// # Errors
    /// Returns an error if the configuration is malformed or the HTTP client
    /// cannot be built.
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        let effects: SharedEffects = Arc::new(SystemEffects::from_config(&config)?);
        Ok(Self { config, effects })
    }

    #[must_use]
    pub fn with_effects(config: Config, effects: SharedEffects) -> Self {
        Self { config, effects }
    }

    pub fn index(&self) -> &dyn PackageIndex {
        self.effects.index()
    }

    pub fn metadata(&self) -> &dyn MetadataSource {
        self.effects.metadata()
    }

    pub fn downloader(&self) -> &dyn ArtifactDownloader {
        self.effects.downloader()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
