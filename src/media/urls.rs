use url::Url;

use crate::errors::MediaError;

/// Direct YouTube embed URLs can be handed to the video tool as-is.
pub const YOUTUBE_EMBED_PREFIX: &str = "https://www.youtube.com/embed/";

/// The platform wraps outbound links in its redirect service; the real
/// target sits in the `z` query parameter.
pub const TUMBLR_REDIRECT_PREFIX: &str = "https://t.umblr.com/redirect";

/// First value bound to `name` in the URL's query string, percent-decoded.
pub fn query_param(url: &str, name: &str) -> Result<String, MediaError> {
    let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| MediaError::MissingParameter {
            name: name.to_string(),
            url: url.to_string(),
        })
}

pub fn is_youtube_embed(url: &str) -> bool {
    url.starts_with(YOUTUBE_EMBED_PREFIX)
}

pub fn is_tumblr_redirect(url: &str) -> bool {
    url.starts_with(TUMBLR_REDIRECT_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_decodes_percent_encoding() {
        let url = "https://example.com/?z=http%3A%2F%2Fflickr.example%2Fv%2F123";
        assert_eq!(
            query_param(url, "z").unwrap(),
            "http://flickr.example/v/123"
        );
    }

    #[test]
    fn query_param_takes_first_value() {
        let url = "https://example.com/?v=first&v=second";
        assert_eq!(query_param(url, "v").unwrap(), "first");
    }

    #[test]
    fn query_param_missing_is_an_error() {
        let err = query_param("https://example.com/?a=1", "z").unwrap_err();
        assert!(matches!(err, MediaError::MissingParameter { .. }));
    }

    #[test]
    fn query_param_rejects_garbage_urls() {
        let err = query_param("not a url", "z").unwrap_err();
        assert!(matches!(err, MediaError::InvalidUrl { .. }));
    }

    #[test]
    fn recognizes_youtube_embeds() {
        assert!(is_youtube_embed("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(!is_youtube_embed("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn recognizes_redirect_wrappers() {
        assert!(is_tumblr_redirect(
            "https://t.umblr.com/redirect?z=https%3A%2F%2Fyoutu.be%2Fabc"
        ));
        assert!(!is_tumblr_redirect("https://youtu.be/abc"));
    }
}
