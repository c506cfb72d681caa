mod downloader;
mod embed;
mod post;
mod urls;

pub use downloader::{Downloader, Fetched, HttpDownloader, MARKER_FILE};
pub use post::{Post, PostBody, PostId};

use std::path::Path;

use tracing::warn;

use crate::errors::MediaError;
use post::{AudioPost, AudioProvider, PhotoPost, VideoPost, VideoProvider};

/// What resolving one post amounted to, for the batch driver's tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Direct downloads finished (or were already on disk).
    Saved { files: usize },
    /// Handed to the external video tool.
    Delegated,
    /// The marker said a delegated fetch was already attempted.
    AlreadySaved,
    /// The post carries no downloadable media.
    NoMedia,
    /// Media exists but there is no safe way to fetch it; logged.
    Unreachable,
}

/// Resolve the media for one saved post record.
///
/// Reads the `info.json` at `info_path`, decides which retrieval strategy the
/// post needs, and drives the downloader. Soft failures (missing remote
/// assets, a failed external tool run) are logged and folded into the
/// outcome; only schema and markup-ambiguity problems surface as errors, and
/// the driver catches those per post.
pub async fn resolve(info_path: &Path, downloader: &dyn Downloader) -> Result<Outcome, MediaError> {
    let text =
        std::fs::read_to_string(info_path).map_err(|source| MediaError::ReadMetadata {
            path: info_path.to_path_buf(),
            source,
        })?;
    let raw: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| MediaError::ParseMetadata {
            path: info_path.to_path_buf(),
            source,
        })?;

    let post = Post::from_value(raw)?;
    let post_dir = info_path.parent().unwrap_or_else(|| Path::new("."));

    match &post.body {
        PostBody::Photo(photo) => resolve_photo(photo, post_dir, downloader).await,
        PostBody::Video(video) => resolve_video(&post.id, video, post_dir, downloader).await,
        PostBody::Audio(audio) => resolve_audio(&post.id, audio),
        PostBody::Answer | PostBody::Chat | PostBody::Link | PostBody::Quote | PostBody::Text => {
            Ok(Outcome::NoMedia)
        }
    }
}

async fn resolve_photo(
    photo: &PhotoPost,
    post_dir: &Path,
    downloader: &dyn Downloader,
) -> Result<Outcome, MediaError> {
    let mut files = 0;
    for entry in &photo.photos {
        match downloader
            .fetch_asset(post_dir, &entry.original_size.url, "")
            .await?
        {
            Fetched::Downloaded | Fetched::AlreadyPresent => files += 1,
            _ => {}
        }
    }
    Ok(Outcome::Saved { files })
}

async fn resolve_video(
    id: &PostId,
    video: &VideoPost,
    post_dir: &Path,
    downloader: &dyn Downloader,
) -> Result<Outcome, MediaError> {
    match &video.video_type {
        VideoProvider::Tumblr => {
            let Some(url) = &video.video_url else {
                warn!(post = %id, "tumblr-hosted video has no video_url");
                return Ok(Outcome::Unreachable);
            };
            match downloader.fetch_asset(post_dir, url, "").await? {
                Fetched::NotFound => Ok(Outcome::Unreachable),
                Fetched::AlreadyPresent => Ok(Outcome::AlreadySaved),
                _ => Ok(Outcome::Saved { files: 1 }),
            }
        }

        VideoProvider::Youtube => {
            // Every embed empty means nothing was ever attached to the post.
            if video.all_embeds_empty() {
                return Ok(Outcome::NoMedia);
            }
            let source = youtube_source(video)?;
            delegate(downloader, post_dir, &source).await
        }

        VideoProvider::Vimeo => {
            let Some(player) = video.best_player() else {
                warn!(post = %id, "vimeo video has no player entries");
                return Ok(Outcome::Unreachable);
            };
            let source = embed::extract_embed_source(&player.embed_code, "iframe", &[])?;
            delegate(downloader, post_dir, &source).await
        }

        VideoProvider::Unknown => {
            // The only unknown-type posts we can do anything with are the
            // ones wrapping a YouTube link in the platform's redirect
            // service.
            let Some(source_url) = video.source_url.as_deref() else {
                warn!(post = %id, "video of unknown provider has no source_url");
                return Ok(Outcome::Unreachable);
            };
            if !urls::is_tumblr_redirect(source_url) {
                warn!(post = %id, url = %source_url, "no download strategy for this source");
                return Ok(Outcome::Unreachable);
            }
            match urls::query_param(source_url, "z") {
                Ok(target) => delegate(downloader, post_dir, &target).await,
                Err(err) => {
                    warn!(post = %id, url = %source_url, %err, "redirect wrapper has no target");
                    Ok(Outcome::Unreachable)
                }
            }
        }

        VideoProvider::Instagram => {
            let Some(url) = video.permalink_url.as_deref() else {
                warn!(post = %id, "instagram video has no permalink_url");
                return Ok(Outcome::Unreachable);
            };
            delegate(downloader, post_dir, url).await
        }

        VideoProvider::Flickr => {
            match video
                .source_url
                .as_deref()
                .and_then(|u| urls::query_param(u, "z").ok())
            {
                Some(target) => warn!(post = %id, url = %target, "flickr video is unreachable"),
                None => warn!(post = %id, "flickr video is unreachable"),
            }
            Ok(Outcome::Unreachable)
        }

        VideoProvider::Other(provider) => {
            warn!(post = %id, %provider, "unsupported video provider");
            Ok(Outcome::Unreachable)
        }
    }
}

/// The real YouTube URL behind a video post. Direct fields win over sniffing
/// the embed markup.
fn youtube_source(video: &VideoPost) -> Result<String, MediaError> {
    if let Some(source_url) = video.source_url.as_deref() {
        if urls::is_youtube_embed(source_url) {
            return Ok(source_url.to_string());
        }
        if let Ok(target) = urls::query_param(source_url, "z") {
            return Ok(target);
        }
    }

    let player = video
        .best_player()
        .ok_or(MediaError::MalformedEmbed {
            selector: "iframe[id=\"youtube_iframe\"]".to_string(),
            count: 0,
        })?;
    embed::extract_embed_source(&player.embed_code, "iframe", &[("id", "youtube_iframe")])
}

fn resolve_audio(id: &PostId, audio: &AudioPost) -> Result<Outcome, MediaError> {
    match &audio.audio_type {
        AudioProvider::Tumblr => {
            let Some(player) = audio.player.as_deref() else {
                warn!(post = %id, "tumblr-hosted audio has no player markup");
                return Ok(Outcome::Unreachable);
            };
            let src = embed::extract_embed_source(
                player,
                "iframe",
                &[("class", "tumblr_audio_player")],
            )?;
            let audio_file = urls::query_param(&src, "audio_file")?;
            warn!(post = %id, url = %audio_file, "no downloader for tumblr-hosted audio");
            Ok(Outcome::Unreachable)
        }

        AudioProvider::Spotify | AudioProvider::Soundcloud => {
            match audio.audio_source_url.as_deref() {
                Some(url) => warn!(post = %id, %url, "streaming audio is unreachable"),
                None => warn!(post = %id, "streaming audio has no source URL"),
            }
            Ok(Outcome::Unreachable)
        }

        AudioProvider::Other(provider) => {
            warn!(post = %id, %provider, "unsupported audio provider");
            Ok(Outcome::Unreachable)
        }
    }
}

async fn delegate(
    downloader: &dyn Downloader,
    post_dir: &Path,
    url: &str,
) -> Result<Outcome, MediaError> {
    match downloader.fetch_video(post_dir, url).await? {
        Fetched::Skipped => Ok(Outcome::AlreadySaved),
        Fetched::AttemptFailed => Ok(Outcome::Unreachable),
        _ => Ok(Outcome::Delegated),
    }
}
