//! Frontmatter document assembly.
//!
//! Builds the persisted artifact: a YAML-like frontmatter block with a
//! fixed key order, an H1 heading, and the Markdown body. Also owns the
//! relative-image rewrite and the cross-platform filename sanitizer.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::macros::format_description;
use url::Url;

use crate::extract::Extraction;
use crate::video;

/// Default tag applied to every clipped document.
pub const DEFAULT_TAG: &str = "clippings";

/// Tag added to video embed documents.
pub const VIDEO_TAG: &str = "video";

/// Title used for stub documents when all extraction attempts failed.
pub const STUB_TITLE: &str = "Untitled Link";

/// Fixed phrase included in every stub body, alongside the failing URL.
pub const STUB_PHRASE: &str = "Content could not be extracted from this page.";

/// Every frontmatter field of a clipped document.
///
/// Key order is a presentation contract: title, source, author, published,
/// clipped, tags, description, image, favicon, url. The on-disk form emits
/// all keys with empty values rendered as `""`; the structured form omits
/// empty fields entirely. The two serializations are intentionally not
/// byte-identical.
#[derive(Debug, Clone, Default)]
pub struct DocumentFields {
    pub title: String,
    pub source: String,
    pub author: Option<String>,
    pub published: Option<String>,
    pub clipped: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub url: String,
}

impl DocumentFields {
    /// Fields for a full article document.
    pub fn from_extraction(extraction: &Extraction, url: &str) -> Self {
        let source = extraction
            .domain
            .as_ref()
            .map(|d| format!("https://{}", d))
            .unwrap_or_else(|| url.to_string());

        Self {
            title: extraction.title.clone(),
            source,
            author: extraction.author.clone(),
            published: extraction.published.clone(),
            clipped: today(),
            tags: vec![DEFAULT_TAG.to_string()],
            description: extraction.description.clone(),
            image: extraction.image.clone(),
            favicon: extraction.favicon.clone(),
            url: url.to_string(),
        }
    }

    /// The on-disk frontmatter block, all keys present, empties as `""`.
    pub fn to_frontmatter(&self) -> String {
        let mut block = String::from("---\n");
        push_string(&mut block, "title", &self.title);
        push_string(&mut block, "source", &self.source);
        push_string(&mut block, "author", self.author.as_deref().unwrap_or(""));
        push_string(&mut block, "published", self.published.as_deref().unwrap_or(""));
        block.push_str(&format!("clipped: {}\n", self.clipped));
        push_tags(&mut block, &self.tags);
        push_string(&mut block, "description", self.description.as_deref().unwrap_or(""));
        push_string(&mut block, "image", self.image.as_deref().unwrap_or(""));
        push_string(&mut block, "favicon", self.favicon.as_deref().unwrap_or(""));
        push_string(&mut block, "url", &self.url);
        block.push_str("---\n");
        block
    }

    /// The structured frontmatter object, empty fields omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        insert_nonempty(&mut map, "title", &self.title);
        insert_nonempty(&mut map, "source", &self.source);
        insert_nonempty(&mut map, "author", self.author.as_deref().unwrap_or(""));
        insert_nonempty(&mut map, "published", self.published.as_deref().unwrap_or(""));
        insert_nonempty(&mut map, "clipped", &self.clipped);
        if !self.tags.is_empty() {
            map.insert("tags".to_string(), json!(self.tags));
        }
        insert_nonempty(&mut map, "description", self.description.as_deref().unwrap_or(""));
        insert_nonempty(&mut map, "image", self.image.as_deref().unwrap_or(""));
        insert_nonempty(&mut map, "favicon", self.favicon.as_deref().unwrap_or(""));
        insert_nonempty(&mut map, "url", &self.url);
        Value::Object(map)
    }
}

fn push_string(block: &mut String, key: &str, value: &str) {
    block.push_str(&format!("{}: {}\n", key, yaml_quote(value)));
}

fn push_tags(block: &mut String, tags: &[String]) {
    if tags.is_empty() {
        block.push_str("tags: []\n");
        return;
    }
    block.push_str("tags:\n");
    for tag in tags {
        block.push_str(&format!("  - {}\n", tag));
    }
}

fn insert_nonempty(map: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Frontmatter block, blank line, H1 heading from the title, blank line,
/// body.
pub fn build_document(fields: &DocumentFields, body: &str) -> String {
    format!("{}\n# {}\n\n{}\n", fields.to_frontmatter(), fields.title, body)
}

/// Metadata-only embed document for a single video link.
///
/// The persisted body is a plain Markdown image link to the canonical
/// watch URL, no player markup.
pub fn build_video_embed(title: &str, canonical_url: &str, video_id: &str) -> (DocumentFields, String) {
    let fields = DocumentFields {
        title: title.to_string(),
        source: "https://youtube.com".to_string(),
        clipped: today(),
        tags: vec![DEFAULT_TAG.to_string(), VIDEO_TAG.to_string()],
        image: Some(video::thumbnail_url(video_id)),
        url: canonical_url.to_string(),
        ..Default::default()
    };
    let body = format!("[![{}]({})]({})", title, video::thumbnail_url(video_id), canonical_url);
    (fields, body)
}

/// Minimal placeholder document for a link that defeated every extraction
/// attempt. Marked processed by the pipeline so broken links are not
/// retried forever.
pub fn build_stub(url: &str) -> (DocumentFields, String) {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    let source = if host.is_empty() { url.to_string() } else { format!("https://{}", host) };

    let fields = DocumentFields {
        title: STUB_TITLE.to_string(),
        source,
        clipped: today(),
        url: url.to_string(),
        ..Default::default()
    };
    let body = format!("{} Original link: {}", STUB_PHRASE, url);
    (fields, body)
}

static MARKDOWN_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());

/// Rewrites relative Markdown image references to absolute URLs.
///
/// Resolution uses a directory-vs-file heuristic: when the base URL's final
/// path segment contains no dot, it is treated as a directory and a
/// trailing slash is appended before joining, so `img/pic.png` under
/// `.../blog/post` resolves as a child of `post`, not a sibling.
pub fn rewrite_image_paths(markdown: &str, base_url: &str) -> String {
    let Ok(base) = Url::parse(base_url) else {
        return markdown.to_string();
    };
    let base = directory_base(base);

    MARKDOWN_IMAGE_RE
        .replace_all(markdown, |caps: &Captures| {
            let target = &caps[2];
            if target.starts_with("http://")
                || target.starts_with("https://")
                || target.starts_with("data:")
                || target.starts_with('#')
            {
                return caps[0].to_string();
            }
            match base.join(target) {
                Ok(absolute) => format!("![{}]({})", &caps[1], absolute),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn directory_base(mut url: Url) -> Url {
    let path = url.path().to_string();
    if !path.ends_with('/') {
        let last = path.rsplit('/').next().unwrap_or("");
        if !last.contains('.') {
            url.set_path(&format!("{}/", path));
        }
    }
    url
}

/// Today's date in `YYYY-MM-DD` form.
pub fn today() -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc().date().format(&format).unwrap_or_default()
}

/// Turns a title into a cross-platform-safe file stem.
///
/// Reserved characters become dashes, non-ASCII is stripped, whitespace is
/// collapsed, and the result is capped at 120 characters.
pub fn sanitize_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_ascii_control() => '-',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed: String = collapsed.chars().take(120).collect();
    let trimmed = trimmed.trim().to_string();

    if trimmed.is_empty() { "Untitled".to_string() } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> DocumentFields {
        DocumentFields {
            title: "A Great Read".to_string(),
            source: "https://example.com".to_string(),
            author: Some("Jo Writer".to_string()),
            published: None,
            clipped: "2026-08-25".to_string(),
            tags: vec!["clippings".to_string()],
            description: None,
            image: Some("https://example.com/cover.png".to_string()),
            favicon: None,
            url: "https://example.com/blog/post".to_string(),
        }
    }

    #[test]
    fn test_frontmatter_key_order() {
        let fm = sample_fields().to_frontmatter();
        let positions: Vec<usize> = [
            "title:", "source:", "author:", "published:", "clipped:", "tags:", "description:", "image:",
            "favicon:", "url:",
        ]
        .iter()
        .map(|key| fm.find(key).unwrap_or_else(|| panic!("missing key {key}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "keys out of order:\n{fm}");
    }

    #[test]
    fn test_frontmatter_empty_fields_rendered_as_quotes() {
        let fm = sample_fields().to_frontmatter();
        assert!(fm.contains("published: \"\""));
        assert!(fm.contains("description: \"\""));
        assert!(fm.contains("favicon: \"\""));
    }

    #[test]
    fn test_frontmatter_quoting() {
        let fields = DocumentFields { title: "She said \"hi\"".to_string(), ..sample_fields() };
        let fm = fields.to_frontmatter();
        assert!(fm.contains(r#"title: "She said \"hi\"""#));
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let value = sample_fields().to_json();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("author"));
        assert!(!obj.contains_key("published"));
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("favicon"));
        assert_eq!(obj["tags"], json!(["clippings"]));
    }

    #[test]
    fn test_build_document_layout() {
        let doc = build_document(&sample_fields(), "Body text.");
        assert!(doc.starts_with("---\n"));
        assert!(doc.contains("---\n\n# A Great Read\n\nBody text.\n"));
    }

    #[test]
    fn test_build_video_embed() {
        let (fields, body) = build_video_embed("My Video", "https://www.youtube.com/watch?v=abc123", "abc123");
        assert_eq!(fields.source, "https://youtube.com");
        assert_eq!(fields.url, "https://www.youtube.com/watch?v=abc123");
        assert!(fields.tags.contains(&"video".to_string()));
        assert_eq!(fields.image.as_deref(), Some("https://img.youtube.com/vi/abc123/maxresdefault.jpg"));
        assert!(body.contains("https://www.youtube.com/watch?v=abc123"));
        assert!(!body.contains("<iframe"));
    }

    #[test]
    fn test_build_stub() {
        let (fields, body) = build_stub("https://broken.example.com/page");
        assert_eq!(fields.title, "Untitled Link");
        assert_eq!(fields.source, "https://broken.example.com");
        assert!(body.contains(STUB_PHRASE));
        assert!(body.contains("https://broken.example.com/page"));
    }

    #[test]
    fn test_rewrite_images_directory_base() {
        let out = rewrite_image_paths("![alt](img/pic.png)", "https://example.com/blog/post");
        assert_eq!(out, "![alt](https://example.com/blog/post/img/pic.png)");
    }

    #[test]
    fn test_rewrite_images_file_base() {
        let out = rewrite_image_paths("![alt](img/pic.png)", "https://example.com/blog/post.html");
        assert_eq!(out, "![alt](https://example.com/blog/img/pic.png)");
    }

    #[test]
    fn test_rewrite_images_absolute_untouched() {
        let markdown = "![alt](https://cdn.example.com/pic.png) and ![d](data:image/png;base64,xyz)";
        assert_eq!(rewrite_image_paths(markdown, "https://example.com/blog/post"), markdown);
    }

    #[test]
    fn test_rewrite_images_root_relative() {
        let out = rewrite_image_paths("![alt](/static/pic.png)", "https://example.com/blog/post");
        assert_eq!(out, "![alt](https://example.com/static/pic.png)");
    }

    #[test]
    fn test_rewrite_images_invalid_base_is_noop() {
        assert_eq!(rewrite_image_paths("![a](img/p.png)", "not a url"), "![a](img/p.png)");
    }

    #[test]
    fn test_today_shape() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[7], b'-');
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("What: A Story?"), "What- A Story-");
        assert_eq!(sanitize_filename("Caf\u{e9} notes"), "Caf notes");
        assert_eq!(sanitize_filename("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_filename("\u{4f60}\u{597d}"), "Untitled");
        assert_eq!(sanitize_filename("a".repeat(300).as_str()).len(), 120);
    }
}
