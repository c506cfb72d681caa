use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::MediaError;

/// Sentinel recording that the external video tool was already run for a post
/// directory. Zero bytes; its presence alone short-circuits later passes.
pub const MARKER_FILE: &str = ".marker";

/// What one fetch amounted to. `NotFound` and `AttemptFailed` are soft: they
/// were logged and the rest of the post (and batch) keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Downloaded,
    AlreadyPresent,
    NotFound,
    AttemptFailed,
    Skipped,
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download one byte-stream resource into `dest_dir`, named after the
    /// URL's basename plus `suffix`. Idempotent: an existing destination is
    /// never re-fetched or overwritten.
    async fn fetch_asset(
        &self,
        dest_dir: &Path,
        url: &str,
        suffix: &str,
    ) -> Result<Fetched, MediaError>;

    /// Run the external video tool against `url` with `post_dir` as its
    /// working directory, at most once per directory.
    async fn fetch_video(&self, post_dir: &Path, url: &str) -> Result<Fetched, MediaError>;
}

/// Production downloader: direct HTTP for assets, an external process
/// (yt-dlp by default) for anything that needs stream resolution.
pub struct HttpDownloader {
    client: reqwest::Client,
    video_bin: String,
}

impl HttpDownloader {
    pub fn new(video_bin: impl Into<String>) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(MediaError::Client)?;

        Ok(Self {
            client,
            video_bin: video_bin.into(),
        })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch_asset(
        &self,
        dest_dir: &Path,
        url: &str,
        suffix: &str,
    ) -> Result<Fetched, MediaError> {
        let dest = dest_dir.join(asset_filename(url, suffix)?);
        if dest.exists() {
            debug!(path = %dest.display(), "asset already saved");
            return Ok(Fetched::AlreadyPresent);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| MediaError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            warn!(%url, %status, "remote asset is gone");
            return Ok(Fetched::NotFound);
        }

        let response = response
            .error_for_status()
            .map_err(|source| MediaError::Http {
                url: url.to_string(),
                source,
            })?;

        let bytes = response.bytes().await.map_err(|source| MediaError::Http {
            url: url.to_string(),
            source,
        })?;

        // Stage in the destination directory and rename into place, so an
        // interrupted download never leaves a truncated asset behind.
        let mut staged = NamedTempFile::new_in(dest_dir)?;
        staged.write_all(&bytes)?;
        staged.persist(&dest).map_err(|e| MediaError::Io(e.error))?;

        info!(%url, path = %dest.display(), "asset saved");
        Ok(Fetched::Downloaded)
    }

    async fn fetch_video(&self, post_dir: &Path, url: &str) -> Result<Fetched, MediaError> {
        let marker = post_dir.join(MARKER_FILE);
        if marker.exists() {
            debug!(dir = %post_dir.display(), "video already attempted");
            return Ok(Fetched::Skipped);
        }

        let post_id = dir_post_id(post_dir);
        info!(post = %post_id, %url, bin = %self.video_bin, "delegating video download");

        let output = tokio::process::Command::new(&self.video_bin)
            .arg(url)
            .current_dir(post_dir)
            .stdout(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                bin: self.video_bin.clone(),
                source,
            })?;

        // Record the attempt whether or not the tool succeeded; deleting the
        // marker by hand is the way to force a retry.
        std::fs::write(&marker, b"")?;

        if output.status.success() {
            Ok(Fetched::Downloaded)
        } else {
            let detail = String::from_utf8_lossy(&output.stderr);
            warn!(
                post = %post_id,
                %url,
                status = %output.status,
                "video download failed: {}",
                detail.trim()
            );
            Ok(Fetched::AttemptFailed)
        }
    }
}

/// Destination filename for a direct download: URL path basename + suffix.
fn asset_filename(url: &str, suffix: &str) -> Result<String, MediaError> {
    let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let basename = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MediaError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no path basename".to_string(),
        })?;

    Ok(format!("{basename}{suffix}"))
}

fn dir_post_id(post_dir: &Path) -> String {
    post_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn asset_filename_is_url_basename_plus_suffix() {
        assert_eq!(
            asset_filename("https://media.example/tumblr_abc123_1280.jpg", "").unwrap(),
            "tumblr_abc123_1280.jpg"
        );
        assert_eq!(
            asset_filename("https://media.example/clip?id=9", ".mp4").unwrap(),
            "clip.mp4"
        );
        assert!(asset_filename("https://media.example/", "").is_err());
    }

    #[tokio::test]
    async fn existing_asset_is_not_refetched() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"original").unwrap();

        // The URL is unroutable; touching the network at all would fail the
        // test, which is the point.
        let downloader = HttpDownloader::new("yt-dlp").unwrap();
        let outcome = downloader
            .fetch_asset(dir.path(), "http://192.0.2.1/photo.jpg", "")
            .await
            .unwrap();

        assert_eq!(outcome, Fetched::AlreadyPresent);
        assert_eq!(
            std::fs::read(dir.path().join("photo.jpg")).unwrap(),
            b"original"
        );
    }

    #[tokio::test]
    async fn marker_short_circuits_delegation() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(MARKER_FILE), b"").unwrap();

        // A spawn would error out loudly since the binary does not exist;
        // getting Skipped proves no process was launched.
        let downloader = HttpDownloader::new("no-such-video-tool").unwrap();
        let outcome = downloader
            .fetch_video(dir.path(), "https://www.youtube.com/embed/abc")
            .await
            .unwrap();

        assert_eq!(outcome, Fetched::Skipped);
    }

    #[tokio::test]
    async fn successful_delegation_writes_marker() {
        let dir = tempdir().unwrap();

        let downloader = HttpDownloader::new("true").unwrap();
        let outcome = downloader
            .fetch_video(dir.path(), "https://www.youtube.com/embed/abc")
            .await
            .unwrap();

        assert_eq!(outcome, Fetched::Downloaded);
        assert!(dir.path().join(MARKER_FILE).exists());
    }

    #[tokio::test]
    async fn failed_delegation_is_soft_and_still_marked() {
        let dir = tempdir().unwrap();

        let downloader = HttpDownloader::new("false").unwrap();
        let outcome = downloader
            .fetch_video(dir.path(), "https://www.youtube.com/embed/abc")
            .await
            .unwrap();

        assert_eq!(outcome, Fetched::AttemptFailed);
        assert!(dir.path().join(MARKER_FILE).exists());
    }

    #[tokio::test]
    async fn missing_tool_is_a_hard_error() {
        let dir = tempdir().unwrap();

        let downloader = HttpDownloader::new("no-such-video-tool").unwrap();
        let err = downloader
            .fetch_video(dir.path(), "https://www.youtube.com/embed/abc")
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Spawn { .. }));
        assert!(!dir.path().join(MARKER_FILE).exists());
    }
}
