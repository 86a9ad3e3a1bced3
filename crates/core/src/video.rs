//! Video platform link detection and metadata lookup.
//!
//! Recognizes two host families (the youtube.com domains and the youtu.be
//! short-link domain) and distinguishes single-video links from channel or
//! collection links. Single links are always canonicalized to the
//! `watch?v=<id>` form regardless of how they were written.

use serde::Deserialize;
use url::Url;

/// What kind of video-platform link a URL is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLink {
    /// One video, identified by its platform id.
    Single { id: String },
    /// A channel, user page, or handle. Treated as an ordinary eligible
    /// link by the pipeline, never specially handled.
    Collection,
}

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "music.youtube.com"];
const SHORTLINK_HOST: &str = "youtu.be";

/// Path prefixes that carry a video id in their next segment.
const SINGLE_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live"];

/// Path prefixes that denote a channel or collection.
const COLLECTION_PATH_PREFIXES: &[&str] = &["channel", "c", "user"];

/// Detects whether a URL points at a video platform, and how.
///
/// Returns `None` for anything that is not a recognized video link,
/// including platform URLs that are neither a single video nor a
/// collection (playlists, the front page, search results).
pub fn detect(url: &Url) -> Option<VideoLink> {
    let host = url.host_str()?.to_lowercase();

    if host == SHORTLINK_HOST {
        let id = first_path_segment(url)?;
        return valid_id(&id).then_some(VideoLink::Single { id });
    }

    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return None;
    }

    if let Some(id) = url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())
        && valid_id(&id)
    {
        return Some(VideoLink::Single { id });
    }

    let first = first_path_segment(url)?;
    if SINGLE_PATH_PREFIXES.contains(&first.as_str()) {
        let id = nth_path_segment(url, 1)?;
        return valid_id(&id).then_some(VideoLink::Single { id });
    }
    if COLLECTION_PATH_PREFIXES.contains(&first.as_str()) || first.starts_with('@') {
        return Some(VideoLink::Collection);
    }

    None
}

/// Canonical watch-form URL for a video id.
///
/// This form is what gets persisted back into the input source as the
/// processed marker, never the original short-link or embed form.
pub fn canonical_watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Thumbnail image URL for a video id.
pub fn thumbnail_url(id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id)
}

#[derive(Deserialize)]
struct OembedResponse {
    title: String,
}

/// Best-effort title lookup via the platform's public oEmbed endpoint.
///
/// Any failure (network, non-success status, malformed body) yields `None`;
/// this lookup never blocks or fails the pipeline.
pub async fn lookup_title(client: &reqwest::Client, endpoint: &str, watch_url: &str) -> Option<String> {
    let request = client
        .get(endpoint)
        .query(&[("url", watch_url), ("format", "json")]);

    match request.send().await {
        Ok(response) if response.status().is_success() => match response.json::<OembedResponse>().await {
            Ok(body) => Some(body.title),
            Err(e) => {
                tracing::debug!(url = watch_url, error = %e, "oEmbed response was not parseable");
                None
            }
        },
        Ok(response) => {
            tracing::debug!(url = watch_url, status = %response.status(), "oEmbed lookup refused");
            None
        }
        Err(e) => {
            tracing::debug!(url = watch_url, error = %e, "oEmbed lookup failed");
            None
        }
    }
}

fn first_path_segment(url: &Url) -> Option<String> {
    nth_path_segment(url, 0)
}

fn nth_path_segment(url: &Url, n: usize) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).nth(n)?;
    Some(segment.to_string())
}

fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case("https://youtu.be/abc123")]
    #[case("https://www.youtube.com/watch?v=abc123")]
    #[case("https://www.youtube.com/shorts/abc123")]
    #[case("https://www.youtube.com/embed/abc123")]
    #[case("https://www.youtube.com/live/abc123")]
    #[case("https://m.youtube.com/watch?v=abc123&t=30s")]
    fn test_single_forms(#[case] input: &str) {
        let detected = detect(&parse(input));
        assert_eq!(detected, Some(VideoLink::Single { id: "abc123".to_string() }));
    }

    #[rstest]
    #[case("https://www.youtube.com/channel/UC123")]
    #[case("https://www.youtube.com/c/somechannel")]
    #[case("https://www.youtube.com/user/somebody")]
    #[case("https://www.youtube.com/@somechannel")]
    fn test_collection_forms(#[case] input: &str) {
        assert_eq!(detect(&parse(input)), Some(VideoLink::Collection));
    }

    #[rstest]
    #[case("https://example.com/watch?v=abc123")]
    #[case("https://www.youtube.com/")]
    #[case("https://www.youtube.com/playlist?list=PL123")]
    #[case("https://vimeo.example.org/12345")]
    fn test_non_video(#[case] input: &str) {
        assert_eq!(detect(&parse(input)), None);
    }

    #[test]
    fn test_canonical_watch_url() {
        assert_eq!(canonical_watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(thumbnail_url("abc123"), "https://img.youtube.com/vi/abc123/maxresdefault.jpg");
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert_eq!(detect(&parse("https://youtu.be/abc%20123")), None);
    }
}
