//! Link line classification.
//!
//! Pure functions that parse one raw input line into a canonical task URL
//! and assign it exactly one [`Classification`]. Checks run in a fixed
//! precedence order so the routing stays auditable: already-processed
//! first, then URL validity, then video detection, then the blocked-domain
//! deny-list, then the non-document extension list, else eligible.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::video::{self, VideoLink};

/// Line prefix that marks a link as already handled.
pub const PROCESSED_MARKER: &str = "- [x] ";

/// Default deny-list of hosts that cannot be reliably extracted; matched
/// exactly or by suffix. Overridable per [`crate::Config::blocked_domains`].
pub const BLOCKED_DOMAINS: &[&str] = &[
    "docs.google.com",
    "drive.google.com",
    "notion.so",
    "notion.site",
    "figma.com",
    "miro.com",
];

/// File extensions that are never worth an extraction attempt.
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "webp", "svg", "mp4", "webm", "mp3", "wav", "avi", "mov", "zip", "rar",
    "7z", "tar", "gz", "dmg", "exe", "apk", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").unwrap());

static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://\S+").unwrap());

/// The mutually-exclusive category assigned to one input line.
///
/// Only [`Classification::Eligible`], [`Classification::VideoCollection`],
/// and [`Classification::VideoSingle`] proceed to extraction; everything
/// else is a skip that leaves the line untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Line already carries the processed marker.
    AlreadyProcessed,
    /// No syntactically valid absolute http(s) URL could be extracted.
    NonUrl,
    /// A single video on a recognized platform, canonicalized to watch form.
    VideoSingle { id: String, canonical: String },
    /// A channel or collection on a video platform; routed like any
    /// eligible link.
    VideoCollection { url: String },
    /// Host is on the deny-list.
    BlockedDomain { url: String },
    /// Path ends in a binary/media/archive extension.
    NonDocumentExtension { url: String },
    /// A normal article link, ready for extraction.
    Eligible { url: String },
}

impl Classification {
    /// Whether this line needs a rendered page (browser or fetch).
    pub fn is_render_task(&self) -> bool {
        matches!(self, Classification::Eligible { .. } | Classification::VideoCollection { .. })
    }
}

/// Returns true when the line is already marked processed.
pub fn is_already_processed(line: &str) -> bool {
    line.trim_start().starts_with(PROCESSED_MARKER)
}

/// Strips leading list and checkbox decoration from a line.
fn strip_decoration(line: &str) -> &str {
    let mut rest = line.trim();
    loop {
        let before = rest;
        for prefix in ["- ", "* ", "[ ] ", "[x] ", "[X] "] {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped.trim_start();
            }
        }
        if rest == before {
            return rest;
        }
    }
}

/// Extracts the canonical task URL from a raw line.
///
/// Markdown-style `[text](url)` targets win over bare tokens; otherwise the
/// first bare `http(s)://` token is taken; otherwise the trimmed residue is
/// tried as-is (and typically fails validation). Returns `None` unless the
/// candidate parses as an absolute http(s) URL with a host.
pub fn canonical_task(line: &str) -> Option<Url> {
    let stripped = strip_decoration(line);

    let candidate = if let Some(caps) = MARKDOWN_LINK_RE.captures(stripped) {
        caps[1].to_string()
    } else if let Some(m) = BARE_URL_RE.find(stripped) {
        // A bare token swallows sentence punctuation right after the URL.
        m.as_str().trim_end_matches(['.', ',', ';', ':', ')', ']']).to_string()
    } else {
        stripped.to_string()
    };

    let url = Url::parse(&candidate).ok()?;
    let scheme = url.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }
    url.host_str()?;
    Some(url)
}

fn is_blocked_domain<S: AsRef<str>>(url: &Url, blocked_domains: &[S]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    blocked_domains.iter().any(|blocked| {
        let blocked = blocked.as_ref();
        host == blocked || host.ends_with(&format!(".{}", blocked))
    })
}

fn has_non_document_extension(url: &Url) -> bool {
    // Url::path excludes the query string already.
    let path = url.path().to_lowercase();
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    !ext.contains('/') && NON_DOCUMENT_EXTENSIONS.contains(&ext)
}

/// Classifies one raw input line against the default deny-list.
pub fn classify(line: &str) -> Classification {
    classify_with(line, BLOCKED_DOMAINS)
}

/// Classifies one raw input line against a caller-supplied deny-list.
pub fn classify_with<S: AsRef<str>>(line: &str, blocked_domains: &[S]) -> Classification {
    if is_already_processed(line) {
        return Classification::AlreadyProcessed;
    }

    let Some(url) = canonical_task(line) else {
        return Classification::NonUrl;
    };

    match video::detect(&url) {
        Some(VideoLink::Single { id }) => {
            let canonical = video::canonical_watch_url(&id);
            return Classification::VideoSingle { id, canonical };
        }
        Some(VideoLink::Collection) => return Classification::VideoCollection { url: url.to_string() },
        None => {}
    }

    if is_blocked_domain(&url, blocked_domains) {
        return Classification::BlockedDomain { url: url.to_string() };
    }

    if has_non_document_extension(&url) {
        return Classification::NonDocumentExtension { url: url.to_string() };
    }

    Classification::Eligible { url: url.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/post", "https://example.com/post")]
    #[case("- https://example.com/post", "https://example.com/post")]
    #[case("- [ ] https://example.com/post", "https://example.com/post")]
    #[case("* https://example.com/post", "https://example.com/post")]
    #[case("[My Post](https://example.com/post) extra text", "https://example.com/post")]
    #[case("read this https://example.com/post later", "https://example.com/post")]
    #[case("read https://example.com/post.", "https://example.com/post")]
    #[case("https://example.com/post, then sleep", "https://example.com/post")]
    #[case("(see https://example.com/post)", "https://example.com/post")]
    fn test_canonical_task_extraction(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(canonical_task(line).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("just some note text")]
    #[case("ftp://example.com/file")]
    #[case("")]
    #[case("- [ ] buy milk")]
    fn test_canonical_task_rejects(#[case] line: &str) {
        assert!(canonical_task(line).is_none());
    }

    #[test]
    fn test_markdown_target_wins_over_bare_token() {
        let line = "see https://other.example.org and [here](https://example.com/target)";
        assert_eq!(canonical_task(line).unwrap().as_str(), "https://example.com/target");
    }

    #[test]
    fn test_already_processed_has_highest_precedence() {
        // A marked line is never reclassified, even if the URL would be blocked.
        let line = "- [x] https://docs.google.com/document/d/123";
        assert_eq!(classify(line), Classification::AlreadyProcessed);
    }

    #[rstest]
    #[case("https://docs.google.com/document/d/123")]
    #[case("https://www.notion.so/workspace/page")]
    #[case("https://team.figma.com/file/abc")]
    fn test_blocked_domains(#[case] line: &str) {
        assert!(matches!(classify(line), Classification::BlockedDomain { .. }));
    }

    #[test]
    fn test_classify_with_custom_deny_list() {
        let blocked = vec!["intranet.example".to_string()];
        assert!(matches!(
            classify_with("https://wiki.intranet.example/page", &blocked),
            Classification::BlockedDomain { .. }
        ));
        // A custom list replaces the default, not extends it.
        assert!(matches!(
            classify_with("https://docs.google.com/document/d/1", &blocked),
            Classification::Eligible { .. }
        ));
    }

    #[test]
    fn test_blocked_is_suffix_match_not_substring() {
        assert!(matches!(
            classify("https://notnotion.so/page"),
            Classification::Eligible { .. }
        ));
    }

    #[rstest]
    #[case("https://example.com/paper.pdf")]
    #[case("https://example.com/photo.PNG")]
    #[case("https://example.com/archive.tar.gz?download=1")]
    fn test_non_document_extensions(#[case] line: &str) {
        assert!(matches!(classify(line), Classification::NonDocumentExtension { .. }));
    }

    #[test]
    fn test_dot_in_directory_is_not_an_extension() {
        assert!(matches!(
            classify("https://example.com/v1.2/changelog"),
            Classification::Eligible { .. }
        ));
    }

    #[rstest]
    #[case("https://youtu.be/abc123")]
    #[case("https://www.youtube.com/watch?v=abc123")]
    #[case("https://www.youtube.com/shorts/abc123")]
    fn test_video_single_canonicalization(#[case] line: &str) {
        let Classification::VideoSingle { canonical, .. } = classify(line) else {
            panic!("expected VideoSingle for {line}");
        };
        assert_eq!(canonical, "https://www.youtube.com/watch?v=abc123");
    }

    #[rstest]
    #[case("https://www.youtube.com/channel/UC123")]
    #[case("https://www.youtube.com/@somechannel")]
    fn test_video_collections_are_render_tasks(#[case] line: &str) {
        let classification = classify(line);
        assert!(matches!(classification, Classification::VideoCollection { .. }));
        assert!(classification.is_render_task());
    }

    #[test]
    fn test_video_precedence_over_extension() {
        // Video detection runs before the extension check.
        assert!(matches!(
            classify("https://www.youtube.com/watch?v=abc123&ext=.pdf"),
            Classification::VideoSingle { .. }
        ));
    }

    #[test]
    fn test_non_url_lines() {
        assert_eq!(classify("- [ ] remember to water plants"), Classification::NonUrl);
        assert_eq!(classify(""), Classification::NonUrl);
    }

    #[test]
    fn test_eligible_is_render_task() {
        assert!(classify("https://example.com/article").is_render_task());
        assert!(!classify("- [x] https://example.com/article").is_render_task());
        assert!(!classify("https://example.com/file.pdf").is_render_task());
    }
}
