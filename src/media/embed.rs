use scraper::{Html, Selector};

use crate::errors::MediaError;

/// Locate the single embedded frame matching `tag` (plus optional exact-match
/// attribute constraints) in a player blob and return its `src`.
///
/// Anything other than exactly one match is an error: with zero matches there
/// is nothing to download, and with several we would be guessing which player
/// the post actually refers to.
pub fn extract_embed_source(
    markup: &str,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Result<String, MediaError> {
    let mut selector = tag.to_string();
    for (name, value) in attrs {
        selector.push_str(&format!("[{name}=\"{value}\"]"));
    }

    let parsed =
        Selector::parse(&selector).map_err(|_| MediaError::InvalidSelector(selector.clone()))?;

    let document = Html::parse_fragment(markup);
    let found: Vec<_> = document.select(&parsed).collect();
    if found.len() != 1 {
        return Err(MediaError::MalformedEmbed {
            selector,
            count: found.len(),
        });
    }

    found[0]
        .value()
        .attr("src")
        .map(|src| src.to_string())
        .ok_or(MediaError::MissingEmbedSource { selector })
}
