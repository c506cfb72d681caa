use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod api;
mod config;
mod errors;
mod media;
mod store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Paginate the blog API and save one metadata record per post
    SaveMetadata {
        /// Blog identifier, as used by the API, e.g. "example.tumblr.com"
        #[arg(long)]
        blog_identifier: Option<String>,

        /// OAuth API key (register at https://www.tumblr.com/oauth/apps)
        #[arg(long)]
        api_key: Option<String>,

        /// Directory for saving metadata
        #[arg(long)]
        dst: Option<String>,

        /// Whether to save authored posts or likes
        #[arg(long, value_enum, default_value = "posts")]
        mode: Mode,
    },

    /// Walk saved metadata and download the media each post references
    SaveMedia {
        /// Directory where metadata was saved
        #[arg(long)]
        metadata: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Posts,
    Likes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if config.log_format() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match args.command {
        Command::SaveMetadata {
            blog_identifier,
            api_key,
            dst,
            mode,
        } => {
            let blog = blog_identifier
                .or_else(|| config.blog_identifier.clone())
                .context("--blog-identifier is required (flag or config file)")?;
            let key = api_key
                .or_else(|| config.api_key.clone())
                .context("--api-key is required (flag or config file)")?;
            let dst = dst
                .or_else(|| config.dst.clone())
                .unwrap_or_else(|| "tumblr".to_string());

            save_metadata(&blog, &key, Path::new(&dst), mode).await
        }

        Command::SaveMedia { metadata } => {
            let root = metadata
                .or_else(|| config.dst.clone())
                .unwrap_or_else(|| "tumblr".to_string());

            save_media(Path::new(&root), config.video_downloader()).await
        }
    }
}

async fn save_metadata(blog: &str, api_key: &str, dst: &Path, mode: Mode) -> Result<()> {
    let client = api::Client::new(blog, api_key)?;
    let mut saved = 0u64;

    match mode {
        Mode::Likes => {
            let total = client.liked_count().await?;
            info!(blog, total, "saving liked posts");

            let mut pager = client.likes();
            loop {
                let page = pager.next_page().await?;
                if page.is_empty() {
                    break;
                }
                for post in &page {
                    store::save_post_metadata(dst, post)?;
                    saved += 1;
                }
                info!(saved, total, "page saved");
            }
        }

        Mode::Posts => {
            let total = client.total_posts().await?;
            info!(blog, total, "saving authored posts");

            let mut pager = client.posts();
            loop {
                let page = pager.next_page().await?;
                if page.is_empty() {
                    break;
                }
                for post in &page {
                    store::save_post_metadata(dst, post)?;
                    saved += 1;
                }
                info!(saved, total, "page saved");
            }
        }
    }

    info!(saved, dst = %dst.display(), "metadata saved");
    Ok(())
}

async fn save_media(root: &Path, video_bin: &str) -> Result<()> {
    let downloader = media::HttpDownloader::new(video_bin)?;
    let files: Vec<_> = store::find_metadata_files(root).collect();
    info!(posts = files.len(), root = %root.display(), "resolving media");

    let mut saved = 0usize;
    let mut no_media = 0usize;
    let mut unreachable = 0usize;
    let mut skipped = 0usize;

    for path in &files {
        match media::resolve(path, &downloader).await {
            Ok(media::Outcome::Saved { .. })
            | Ok(media::Outcome::Delegated)
            | Ok(media::Outcome::AlreadySaved) => saved += 1,
            Ok(media::Outcome::NoMedia) => no_media += 1,
            Ok(media::Outcome::Unreachable) => unreachable += 1,
            Err(err) => {
                // One malformed post must not bring down a pass over
                // thousands of saved records.
                warn!(path = %path.display(), %err, "failed to resolve post media");
                skipped += 1;
            }
        }
    }

    info!(
        processed = files.len(),
        saved, no_media, unreachable, skipped,
        "media pass finished"
    );
    Ok(())
}
