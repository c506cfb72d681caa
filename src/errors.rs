use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving a post's media.
///
/// Only `UnrecognizedPostType` and `MalformedEmbed` mean "this post cannot be
/// handled safely"; transport-level variants wrap failures that the batch
/// driver logs and moves past.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("post {id}: unrecognized post type {kind:?}")]
    UnrecognizedPostType { id: String, kind: String },

    #[error("post {id}: invalid {kind} record: {source}")]
    InvalidPost {
        id: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("post record has no usable id/type: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("embed markup matched {count} elements for {selector:?}, expected exactly one")]
    MalformedEmbed { selector: String, count: usize },

    #[error("embed element {selector:?} has no src attribute")]
    MissingEmbedSource { selector: String },

    #[error("not a valid CSS selector: {0:?}")]
    InvalidSelector(String),

    #[error("missing query parameter {name:?} in {url}")]
    MissingParameter { name: String, url: String },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to read metadata {path}: {source}")]
    ReadMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata {path} is not valid JSON: {source}")]
    ParseMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to run {bin:?}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
