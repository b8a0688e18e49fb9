use std::io::{Cursor, Read};

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::debug;
use zip::ZipArchive;

pub const METADATA_SUFFIX: &str = ".dist-info/METADATA";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to download wheel: {0}")]
    Transport(String),
    #[error("wheel is not a readable zip archive: {0}")]
    Archive(String),
    #[error("wheel has no *{METADATA_SUFFIX} member")]
    MissingMetadata,
}

/// Pull the core metadata file out of an in-memory wheel.
///
/// When several members match, the shallowest path wins so vendored
/// `.dist-info` directories never shadow the wheel's own.
///
/// # Errors
/// Returns an error if the bytes are not a zip archive or carry no metadata.
pub fn extract_metadata(bytes: &[u8]) -> Result<String, MetadataError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| MetadataError::Archive(err.to_string()))?;
    let member = archive
        .file_names()
        .filter(|name| name.ends_with(METADATA_SUFFIX))
        .min_by_key(|name| name.matches('/').count())
        .map(ToString::to_string)
        .ok_or(MetadataError::MissingMetadata)?;
    let mut file = archive
        .by_name(&member)
        .map_err(|err| MetadataError::Archive(err.to_string()))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|err| MetadataError::Archive(err.to_string()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Downloads whole wheels to read their metadata.
pub struct HttpMetadataFetcher {
    client: Client,
}

impl HttpMetadataFetcher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns an error when the wheel cannot be fetched or read.
    pub fn fetch_metadata(&self, url: &str) -> Result<String, MetadataError> {
        self.log_size(url);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| MetadataError::Transport(err.to_string()))?;
        let bytes = response
            .bytes()
            .map_err(|err| MetadataError::Transport(err.to_string()))?;
        extract_metadata(&bytes)
    }

    // Size probe is informational; failures here never fail the fetch.
    fn log_size(&self, url: &str) {
        let size = self.client.head(url).send().ok().and_then(|response| {
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
        });
        match size {
            Some(bytes) => debug!(
                url,
                size_mb = %format!("{:.2}", megabytes(bytes)),
                "fetching wheel for metadata"
            ),
            None => debug!(url, "fetching wheel for metadata (size unknown)"),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use std::io::Write;
    use std::panic;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    pub(crate) fn wheel_bytes(members: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in members {
            writer.start_file(*name, FileOptions::default())?;
            writer.write_all(contents.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    #[test]
    fn reads_the_dist_info_metadata() -> Result<()> {
        let bytes = wheel_bytes(&[
            ("demo/__init__.py", ""),
            (
                "demo-1.0.dist-info/METADATA",
                "Metadata-Version: 2.1\nName: demo\nRequires-Dist: idna\n",
            ),
        ])?;
        let metadata = extract_metadata(&bytes)?;
        assert!(metadata.contains("Requires-Dist: idna"));
        Ok(())
    }

    #[test]
    fn vendored_dist_info_does_not_shadow_the_wheel() -> Result<()> {
        let bytes = wheel_bytes(&[
            (
                "demo/_vendor/inner-2.0.dist-info/METADATA",
                "Name: inner\n",
            ),
            ("demo-1.0.dist-info/METADATA", "Name: demo\n"),
        ])?;
        assert_eq!(extract_metadata(&bytes)?, "Name: demo\n");
        Ok(())
    }

    #[test]
    fn missing_member_and_garbage_bytes_are_errors() -> Result<()> {
        let bytes = wheel_bytes(&[("demo/__init__.py", "")])?;
        assert_eq!(
            extract_metadata(&bytes),
            Err(MetadataError::MissingMetadata)
        );
        assert!(matches!(
            extract_metadata(b"definitely not a zip"),
            Err(MetadataError::Archive(_))
        ));
        Ok(())
    }

    #[test]
    fn fetches_over_http() -> Result<()> {
        let Ok(server) = panic::catch_unwind(Server::run) else {
            eprintln!("skipping metadata fetch test (httptest server unavailable)");
            return Ok(());
        };
        let bytes = wheel_bytes(&[("demo-1.0.dist-info/METADATA", "Name: demo\n")])?;
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/demo-1.0-py3-none-any.whl"))
                .times(..)
                .respond_with(status_code(200)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/demo-1.0-py3-none-any.whl"))
                .respond_with(status_code(200).body(bytes)),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/gone.whl"))
                .times(..)
                .respond_with(status_code(404)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/gone.whl"))
                .respond_with(status_code(404)),
        );

        let fetcher = HttpMetadataFetcher::new(Client::new());
        let metadata =
            fetcher.fetch_metadata(&server.url_str("/demo-1.0-py3-none-any.whl"))?;
        assert_eq!(metadata, "Name: demo\n");
        assert!(matches!(
            fetcher.fetch_metadata(&server.url_str("/gone.whl")),
            Err(MetadataError::Transport(_))
        ));
        Ok(())
    }
}
