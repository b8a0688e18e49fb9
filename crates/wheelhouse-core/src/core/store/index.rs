use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use wheelhouse_domain::{normalize_dist_name, ArtifactListing};

use crate::config::NetworkConfig;

/// PEP 691 JSON flavor of the simple repository API.
pub const SIMPLE_JSON_ACCEPT: &str = "application/vnd.pypi.simple.v1+json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("package `{package}` is not on the index")]
    NotFound { package: String },
    #[error("index lookup for `{package}` failed: {reason}")]
    Transport { package: String, reason: String },
}

impl IndexError {
    fn transport(package: &str, reason: impl ToString) -> Self {
        Self::Transport {
            package: package.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SimpleProjectResponse {
    files: Vec<SimpleFile>,
}

#[derive(Deserialize)]
struct SimpleFile {
    filename: String,
    url: String,
}

/// Lists a project's files from a PEP 691 simple index.
pub struct SimpleIndexClient {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl SimpleIndexClient {
    #[must_use]
    pub fn new(client: Client, network: &NetworkConfig) -> Self {
        let mut base = network.index_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            client,
            base,
            timeout: network.index_timeout,
        }
    }

    /// `{index}/{normalized-name}/`
    ///
    /// # Errors
    /// Returns an error if the name cannot be joined onto the index URL.
    pub fn project_url(&self, normalized: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!("{normalized}/"))
    }

    /// Look up every file the index knows for `package`.
    ///
    /// # Errors
    /// `IndexError::NotFound` on a 404; `IndexError::Transport` for any other
    /// transport, status, or decoding failure.
    pub fn fetch(&self, package: &str) -> Result<Vec<ArtifactListing>, IndexError> {
        let normalized = normalize_dist_name(package);
        let url = self
            .project_url(&normalized)
            .map_err(|err| IndexError::transport(package, err))?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, SIMPLE_JSON_ACCEPT)
            .timeout(self.timeout)
            .send()
            .map_err(|err| IndexError::transport(package, err))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound {
                package: package.to_string(),
            });
        }
        let project = response
            .error_for_status()
            .map_err(|err| IndexError::transport(package, err))?
            .json::<SimpleProjectResponse>()
            .map_err(|err| IndexError::transport(package, format!("invalid JSON: {err}")))?;

        Ok(project
            .files
            .into_iter()
            .filter_map(|file| match url.join(&file.url) {
                Ok(resolved) => Some(ArtifactListing::new(file.filename, resolved.to_string())),
                Err(err) => {
                    debug!(filename = %file.filename, %err, "skipping listing with unusable URL");
                    None
                }
            })
            .collect())
    }
}
