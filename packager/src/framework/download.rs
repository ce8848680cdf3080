//! Source archive download.
//!
//! Provides a trait-based abstraction over fetching the upstream FreeRTOS
//! release so tests can substitute local fixtures for the network.

use log::info;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Trait for downloading an archive to a local path.
///
/// # Examples
///
/// ```
/// use s32ds_packager::framework::download::HttpDownloader;
/// use std::time::Duration;
///
/// let downloader = HttpDownloader::new(Duration::from_secs(300));
/// // Use downloader.download(url, dest) in production
/// # let _ = downloader;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveDownloader {
    /// Download `url` into `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the file write fails.
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered 404.
    #[error("archive not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] io::Error),
}

/// HTTP downloader using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// Downloader whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ArchiveDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        info!("downloading {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        io::copy(&mut response.into_body().as_reader(), &mut staging)?;
        staging.persist(dest).map_err(|err| DownloadError::Io(err.error))?;
        Ok(())
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(404, true)]
    #[case::server_error(500, false)]
    fn maps_status_codes(#[case] status: u16, #[case] not_found: bool) {
        let mapped = map_ureq_error("https://example.test/a.zip", &ureq::Error::StatusCode(status));
        assert_eq!(matches!(mapped, DownloadError::NotFound { .. }), not_found);
    }
}
