//! Content extraction from rendered HTML.
//!
//! [`ContentExtractor`] is the adapter boundary the pipeline talks to; the
//! default [`ReadabilityExtractor`] strips obvious junk with a streaming
//! rewriter, pulls metadata from meta tags with priority fallbacks, picks
//! the main content container, and converts it to Markdown.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{ClipvaultError, Result};

/// Structured output of a successful extraction.
///
/// The Markdown body is the only required field; every metadata field is
/// best-effort.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub title: String,
    pub author: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub domain: Option<String>,
    /// Body content as Markdown. Never empty: an empty body is reported as
    /// [`ClipvaultError::NoContent`] instead.
    pub markdown: String,
}

/// Adapter boundary for turning final HTML into an [`Extraction`].
pub trait ContentExtractor: Send + Sync {
    /// Extracts readable content from `html`, resolving references against
    /// `base_url`. The single failure signal is an absent or empty body.
    fn extract(&self, html: &str, base_url: &str) -> Result<Extraction>;
}

/// Default extractor built on scraper + htmd.
#[derive(Debug, Default)]
pub struct ReadabilityExtractor;

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, base_url: &str) -> Result<Extraction> {
        let cleaned = strip_junk(html);
        let doc = Html::parse_document(&cleaned);
        let base = Url::parse(base_url).ok();

        let content_html = select_content(&doc).ok_or(ClipvaultError::NoContent)?;
        let markdown = htmd::convert(&content_html).unwrap_or_default().trim().to_string();
        if markdown.is_empty() {
            return Err(ClipvaultError::NoContent);
        }

        Ok(Extraction {
            title: extract_title(&doc).unwrap_or_else(|| "Untitled".to_string()),
            author: extract_author(&doc),
            published: extract_published(&doc),
            description: meta_content(&doc, "og:description").or_else(|| meta_content(&doc, "description")),
            image: meta_content(&doc, "og:image").and_then(|src| absolutize(base.as_ref(), &src)),
            favicon: extract_favicon(&doc, base.as_ref()),
            domain: base.as_ref().and_then(|u| u.host_str().map(str::to_string)),
            markdown,
        })
    }
}

/// Remove elements that never contribute readable content.
fn strip_junk(html: &str) -> String {
    let mut output = Vec::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("script, style, noscript, svg, form, nav, aside, footer", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() || output.is_empty() {
        return html.to_string();
    }
    String::from_utf8(output).unwrap_or_else(|_| html.to_string())
}

/// Pick the most article-like container, falling back to the whole body.
fn select_content(doc: &Html) -> Option<String> {
    for selector in ["article", "main", "[role=main]", "#content", "body"] {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            let inner = el.inner_html();
            if !inner.trim().is_empty() {
                return Some(inner);
            }
        }
    }
    None
}

/// Title priority: og:title, twitter:title, `<title>`, first `<h1>`.
fn extract_title(doc: &Html) -> Option<String> {
    if let Some(title) = meta_content(doc, "og:title") {
        return Some(title);
    }
    if let Some(title) = meta_content(doc, "twitter:title") {
        return Some(title);
    }
    if let Some(title) = first_text(doc, "title") {
        return Some(title);
    }
    first_text(doc, "h1")
}

fn extract_author(doc: &Html) -> Option<String> {
    meta_content(doc, "author")
        .or_else(|| meta_content(doc, "article:author"))
        .or_else(|| first_text(doc, "[rel=author]"))
}

fn extract_published(doc: &Html) -> Option<String> {
    meta_content(doc, "article:published_time")
        .or_else(|| meta_content(doc, "date"))
        .or_else(|| first_attr(doc, "time[datetime]", "datetime"))
}

fn extract_favicon(doc: &Html, base: Option<&Url>) -> Option<String> {
    let href = first_attr(doc, r#"link[rel="icon"]"#, "href")
        .or_else(|| first_attr(doc, r#"link[rel="shortcut icon"]"#, "href"))
        .or_else(|| first_attr(doc, r#"link[rel="apple-touch-icon"]"#, "href"))?;
    absolutize(base, &href)
}

/// Reads the content attribute of a meta tag matched by name or property.
fn meta_content(doc: &Html, key: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[name="{key}"], meta[property="{key}"]"#)).ok()?;
    doc.select(&sel)
        .find_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|el: ElementRef| el.text().collect::<String>().trim().to_string())
        .find(|s| !s.is_empty())
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn absolutize(base: Option<&Url>, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("data:") {
        return Some(href.to_string());
    }
    base?.join(href).ok().map(|u| u.to_string())
}
