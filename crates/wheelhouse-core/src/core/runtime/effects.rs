use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use wheelhouse_domain::ArtifactListing;

use crate::config::Config;
use crate::store::index::{IndexError, SimpleIndexClient};
use crate::store::metadata::{HttpMetadataFetcher, MetadataError};
use crate::store::{http_client, HttpDownloader};

pub trait PackageIndex: Send + Sync {
    /// Every file the index lists for `package`, in index order.
    fn list_artifacts(&self, package: &str) -> Result<Vec<ArtifactListing>, IndexError>;
}

pub trait MetadataSource: Send + Sync {
    /// Core metadata text of the wheel at `url`.
    fn fetch_metadata(&self, url: &str) -> Result<String, MetadataError>;
}

pub trait ArtifactDownloader: Send + Sync {
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64>;
}

pub trait Effects: Send + Sync {
    fn index(&self) -> &dyn PackageIndex;
    fn metadata(&self) -> &dyn MetadataSource;
    fn downloader(&self) -> &dyn ArtifactDownloader;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    index: SimpleIndexClient,
    metadata: HttpMetadataFetcher,
    downloader: HttpDownloader,
}

impl SystemEffects {
    /// Wires the HTTP-backed effects for `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(config.network())?;
        Ok(Self {
            index: SimpleIndexClient::new(client.clone(), config.network()),
            metadata: HttpMetadataFetcher::new(client.clone()),
            downloader: HttpDownloader::new(client),
        })
    }
}

impl Effects for SystemEffects {
    fn index(&self) -> &dyn PackageIndex {
        &self.index
    }

    fn metadata(&self) -> &dyn MetadataSource {
        &self.metadata
    }

    fn downloader(&self) -> &dyn ArtifactDownloader {
        &self.downloader
    }
}

impl PackageIndex for SimpleIndexClient {
    fn list_artifacts(&self, package: &str) -> Result<Vec<ArtifactListing>, IndexError> {
        self.fetch(package)
    }
}

impl MetadataSource for HttpMetadataFetcher {
    fn fetch_metadata(&self, url: &str) -> Result<String, MetadataError> {
        HttpMetadataFetcher::fetch_metadata(self, url)
    }
}

impl ArtifactDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        HttpDownloader::download(self, url, dest)
    }
}
