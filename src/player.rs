use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

/// Privacy-enhanced embed host. The URL templates are an external contract
/// with the video hosting provider and are parameterized by the video id
/// only.
const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";
const WATCH_BASE: &str = "https://www.youtube.com/watch";

pub const CHANNEL_URL: &str = "https://www.youtube.com/@DarkKokan";

// Everything a path segment must escape beyond raw controls.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%')
    .add(b'&');

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("video id required")]
    MissingId,
}

/// Builds the embedded player URL for a video, with autoplay enabled and
/// minimal branding.
pub fn embed_url(video_id: &str) -> Result<String, UrlError> {
    let id = sanitize_id(video_id)?;
    let encoded = utf8_percent_encode(&id, SEGMENT);
    let mut url = Url::parse(&format!("{EMBED_BASE}{encoded}"))
        .map_err(|_| UrlError::MissingId)?;
    url.query_pairs_mut()
        .append_pair("autoplay", "1")
        .append_pair("rel", "0")
        .append_pair("modestbranding", "1");
    Ok(url.into())
}

/// Builds the external share link for the same video.
pub fn watch_url(video_id: &str) -> Result<String, UrlError> {
    let id = sanitize_id(video_id)?;
    let url = Url::parse_with_params(WATCH_BASE, &[("v", id.as_str())])
        .map_err(|_| UrlError::MissingId)?;
    Ok(url.into())
}

fn sanitize_id(raw: &str) -> Result<String, UrlError> {
    let id = raw.trim().replace("&amp;", "&");
    if id.is_empty() {
        return Err(UrlError::MissingId);
    }
    Ok(id)
}

/// Opens the share link in the system browser.
pub fn open_watch_page(video_id: &str) -> Result<String> {
    let url = watch_url(video_id).context("build watch link")?;
    webbrowser::open(&url).with_context(|| format!("open {url} in browser"))?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_url_enables_autoplay_with_minimal_branding() {
        let url = embed_url("abc123").unwrap();
        assert!(url.starts_with("https://www.youtube-nocookie.com/embed/abc123?"));
        assert!(url.contains("autoplay=1"));
        assert!(url.contains("rel=0"));
        assert!(url.contains("modestbranding=1"));
    }

    #[test]
    fn watch_url_carries_the_video_id() {
        let url = watch_url("abc123").unwrap();
        assert_eq!(url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert_eq!(embed_url("  "), Err(UrlError::MissingId));
        assert_eq!(watch_url(""), Err(UrlError::MissingId));
    }

    #[test]
    fn ids_are_escaped_into_the_embed_path() {
        let url = embed_url("a b/c").unwrap();
        assert!(url.contains("/embed/a%20b%2Fc?"));
    }

    #[test]
    fn encoded_entities_are_sanitized() {
        let url = watch_url("abc&amp;123").unwrap();
        assert!(url.contains("v=abc%26123"));
    }
}
