use std::collections::HashMap;
use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use url::Url;

pub(crate) const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple";
pub(crate) const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_DOWNLOAD_WORKERS: usize = 16;
pub(crate) const DEFAULT_STALE_CLAIM: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    fn seconds(&self, key: &str) -> Result<Option<Duration>> {
        let Some(raw) = self.var(key) else {
            return Ok(None);
        };
        let secs = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow!("{key} must be a whole number of seconds, got `{raw}`"))?;
        Ok(Some(Duration::from_secs(secs)))
    }
}

/// Ambient settings that do not change the target of a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) network: NetworkConfig,
    pub(crate) mirror: MirrorConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if an override is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    /// # Errors
    /// Returns an error if an override is present but malformed.
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let index_url = snapshot
            .var("WHEELHOUSE_INDEX_URL")
            .unwrap_or(DEFAULT_INDEX_URL);
        let index_url = Url::parse(index_url.trim())
            .map_err(|err| anyhow!("WHEELHOUSE_INDEX_URL `{index_url}` is not a URL: {err}"))?;
        let downloads = match snapshot.var("WHEELHOUSE_DOWNLOADS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow!("WHEELHOUSE_DOWNLOADS must be a number, got `{raw}`"))?,
            None => thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        };
        Ok(Self {
            network: NetworkConfig {
                index_url,
                index_timeout: snapshot
                    .seconds("WHEELHOUSE_INDEX_TIMEOUT")?
                    .unwrap_or(DEFAULT_INDEX_TIMEOUT),
                download_timeout: snapshot.seconds("WHEELHOUSE_DOWNLOAD_TIMEOUT")?,
                keep_proxies: crate::net::keep_proxies(snapshot),
            },
            mirror: MirrorConfig {
                download_workers: downloads.clamp(1, MAX_DOWNLOAD_WORKERS),
                stale_claim_after: snapshot
                    .seconds("WHEELHOUSE_STALE_CLAIM")?
                    .unwrap_or(DEFAULT_STALE_CLAIM),
            },
        })
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    #[must_use]
    pub fn mirror(&self) -> &MirrorConfig {
        &self.mirror
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Base of the simple index; package listings live at `{index_url}/{name}/`.
    pub index_url: Url,
    pub index_timeout: Duration,
    /// `None` lets whole-wheel downloads run for as long as they need.
    pub download_timeout: Option<Duration>,
    pub keep_proxies: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MirrorConfig {
    pub download_workers: usize,
    /// A `.part` file older than this is left over from a dead run.
    pub stale_claim_after: Duration,
}
