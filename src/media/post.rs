use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::MediaError;

/// Post identifier. The API emits integers for older posts and strings for
/// newer ones; both normalize to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId(String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => PostId(n.to_string()),
            Raw::Str(s) => PostId(s),
        })
    }
}

/// One post record, decoded from a saved `info.json`.
#[derive(Debug)]
pub struct Post {
    pub id: PostId,
    pub body: PostBody,
}

#[derive(Debug)]
pub enum PostBody {
    Photo(PhotoPost),
    Video(VideoPost),
    Audio(AudioPost),
    Answer,
    Chat,
    Link,
    Quote,
    Text,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    id: PostId,
    #[serde(rename = "type")]
    kind: String,
}

impl Post {
    /// Decode a raw post record. The envelope (`id` + `type`) is read first
    /// so an unknown type becomes an `UnrecognizedPostType` naming the post,
    /// and each known type decodes into its own schema.
    pub fn from_value(raw: Value) -> Result<Self, MediaError> {
        let envelope: Envelope =
            serde_json::from_value(raw.clone()).map_err(MediaError::InvalidEnvelope)?;

        let body = match envelope.kind.as_str() {
            "photo" => PostBody::Photo(decode(&envelope, raw)?),
            "video" => PostBody::Video(decode(&envelope, raw)?),
            "audio" => PostBody::Audio(decode(&envelope, raw)?),
            "answer" => PostBody::Answer,
            "chat" => PostBody::Chat,
            "link" => PostBody::Link,
            "quote" => PostBody::Quote,
            "text" => PostBody::Text,
            other => {
                return Err(MediaError::UnrecognizedPostType {
                    id: envelope.id.to_string(),
                    kind: other.to_string(),
                })
            }
        };

        Ok(Post {
            id: envelope.id,
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(envelope: &Envelope, raw: Value) -> Result<T, MediaError> {
    serde_json::from_value(raw).map_err(|source| MediaError::InvalidPost {
        id: envelope.id.to_string(),
        kind: envelope.kind.clone(),
        source,
    })
}

#[derive(Debug, Deserialize)]
pub struct PhotoPost {
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
pub struct Photo {
    pub original_size: PhotoSize,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoPost {
    #[serde(default)]
    pub video_type: VideoProvider,
    #[serde(default)]
    pub player: Vec<Player>,
    pub video_url: Option<String>,
    pub source_url: Option<String>,
    pub permalink_url: Option<String>,
}

impl VideoPost {
    /// The widest player embed. Ties are not order-sensitive.
    pub fn best_player(&self) -> Option<&Player> {
        self.player.iter().max_by_key(|p| p.width)
    }

    pub fn all_embeds_empty(&self) -> bool {
        self.player.iter().all(|p| p.embed_code.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Player {
    #[serde(default, deserialize_with = "embed_code_or_empty")]
    pub embed_code: String,
    #[serde(default)]
    pub width: u32,
}

// The API emits `false` instead of a string when a player has no embed.
fn embed_code_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum VideoProvider {
    Tumblr,
    Youtube,
    Vimeo,
    Instagram,
    Flickr,
    Unknown,
    Other(String),
}

impl From<String> for VideoProvider {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tumblr" => Self::Tumblr,
            "youtube" => Self::Youtube,
            "vimeo" => Self::Vimeo,
            "instagram" => Self::Instagram,
            "flickr" => Self::Flickr,
            "unknown" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl Default for VideoProvider {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for VideoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tumblr => f.write_str("tumblr"),
            Self::Youtube => f.write_str("youtube"),
            Self::Vimeo => f.write_str("vimeo"),
            Self::Instagram => f.write_str("instagram"),
            Self::Flickr => f.write_str("flickr"),
            Self::Unknown => f.write_str("unknown"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioPost {
    #[serde(default)]
    pub audio_type: AudioProvider,
    pub player: Option<String>,
    pub audio_source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum AudioProvider {
    Tumblr,
    Spotify,
    Soundcloud,
    Other(String),
}

impl From<String> for AudioProvider {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tumblr" => Self::Tumblr,
            "spotify" => Self::Spotify,
            "soundcloud" => Self::Soundcloud,
            _ => Self::Other(s),
        }
    }
}

impl Default for AudioProvider {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for AudioProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tumblr => f.write_str("tumblr"),
            Self::Spotify => f.write_str("spotify"),
            Self::Soundcloud => f.write_str("soundcloud"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_photo_post() {
        let post = Post::from_value(json!({
            "id": 123456,
            "type": "photo",
            "photos": [
                {"original_size": {"url": "https://media.example/a.jpg", "width": 1280, "height": 720}},
                {"original_size": {"url": "https://media.example/b.jpg", "width": 500, "height": 400}}
            ]
        }))
        .unwrap();

        assert_eq!(post.id.as_str(), "123456");
        match post.body {
            PostBody::Photo(photo) => {
                let urls: Vec<_> = photo
                    .photos
                    .iter()
                    .map(|p| p.original_size.url.as_str())
                    .collect();
                assert_eq!(
                    urls,
                    vec!["https://media.example/a.jpg", "https://media.example/b.jpg"]
                );
            }
            other => panic!("expected photo body, got {other:?}"),
        }
    }

    #[test]
    fn accepts_string_ids() {
        let post = Post::from_value(json!({"id": "987", "type": "text"})).unwrap();
        assert_eq!(post.id.as_str(), "987");
        assert!(matches!(post.body, PostBody::Text));
    }

    #[test]
    fn unknown_type_is_a_schema_error() {
        let err = Post::from_value(json!({"id": 42, "type": "gif-board"})).unwrap_err();
        match err {
            MediaError::UnrecognizedPostType { id, kind } => {
                assert_eq!(id, "42");
                assert_eq!(kind, "gif-board");
            }
            other => panic!("expected UnrecognizedPostType, got {other}"),
        }
    }

    #[test]
    fn video_provider_catches_new_values() {
        assert_eq!(VideoProvider::from("youtube".to_string()), VideoProvider::Youtube);
        assert_eq!(
            VideoProvider::from("dailymotion".to_string()),
            VideoProvider::Other("dailymotion".to_string())
        );
    }

    #[test]
    fn best_player_picks_widest() {
        let post = Post::from_value(json!({
            "id": 1,
            "type": "video",
            "video_type": "vimeo",
            "player": [
                {"embed_code": "<iframe src=\"a\"></iframe>", "width": 320},
                {"embed_code": "<iframe src=\"b\"></iframe>", "width": 640},
                {"embed_code": "<iframe src=\"c\"></iframe>", "width": 480}
            ]
        }))
        .unwrap();

        let PostBody::Video(video) = post.body else {
            panic!("expected video body");
        };
        assert_eq!(video.best_player().unwrap().width, 640);
    }

    #[test]
    fn false_embed_code_reads_as_empty() {
        let post = Post::from_value(json!({
            "id": 1,
            "type": "video",
            "video_type": "youtube",
            "player": [{"embed_code": false, "width": 400}]
        }))
        .unwrap();

        let PostBody::Video(video) = post.body else {
            panic!("expected video body");
        };
        assert!(video.all_embeds_empty());
    }

    #[test]
    fn decodes_audio_post() {
        let post = Post::from_value(json!({
            "id": 7,
            "type": "audio",
            "audio_type": "spotify",
            "audio_source_url": "https://open.spotify.com/track/xyz"
        }))
        .unwrap();

        let PostBody::Audio(audio) = post.body else {
            panic!("expected audio body");
        };
        assert_eq!(audio.audio_type, AudioProvider::Spotify);
        assert_eq!(
            audio.audio_source_url.as_deref(),
            Some("https://open.spotify.com/track/xyz")
        );
    }
}
