use std::io::{self, Write};

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::NetworkConfig;

pub mod index;
pub mod metadata;

const USER_AGENT: &str = concat!("wheelhouse/", env!("CARGO_PKG_VERSION"));
pub(crate) const DOWNLOAD_ATTEMPTS: usize = 3;

/// Shared blocking client. The client-wide timeout only bounds artifact
/// transfers; index lookups set their own per-request timeout.
pub(crate) fn http_client(network: &NetworkConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(network.download_timeout);
    if !network.keep_proxies {
        builder = builder.no_proxy();
    }
    builder.build().context("failed to build http client")
}

/// Streams whole artifacts over HTTP.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// # Errors
    /// Returns an error on transport failures, non-2xx responses, or write errors.
    pub fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?;
        io::copy(&mut response, dest).with_context(|| format!("stream error for {url}"))
    }
}
