//! Process-wide configuration for the clipping pipeline.
//!
//! Every field here is a default: individual batch requests (CLI flags,
//! server request bodies) may override the strategy, return mode, and
//! persistence flag per invocation.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a page is turned into HTML before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Full browser rendering with script execution.
    #[serde(alias = "render")]
    Browser,
    /// Direct HTTP GET of the raw document, no script execution.
    Fetch,
}

impl FromStr for RenderStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" | "render" => Ok(Self::Browser),
            "fetch" | "http" => Ok(Self::Fetch),
            _ => Err(format!("Invalid strategy: {}. Valid options: browser, fetch", s)),
        }
    }
}

/// Shape of the per-line results returned by a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// Full Markdown document strings, one per input line.
    #[serde(alias = "md")]
    Markdown,
    /// Structured `{url, frontmatter, body}` records, skipped lines omitted.
    #[serde(alias = "json", alias = "obj")]
    Structured,
}

impl FromStr for ReturnMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "structured" | "json" | "obj" => Ok(Self::Structured),
            _ => Err(format!("Invalid return mode: {}. Valid options: markdown, structured", s)),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory where clipped documents are written.
    pub vault_dir: PathBuf,
    /// Default render strategy for eligible links.
    pub strategy: RenderStrategy,
    /// Default result shape.
    pub return_mode: ReturnMode,
    /// Whether documents are persisted to the vault by default.
    pub save_to_disk: bool,
    /// Input file for the watch and run modes.
    pub input_file: Option<PathBuf>,
    /// Per-attempt timeout in seconds for fetching and rendering.
    pub timeout: u64,
    /// Deny-listed hosts, matched exactly or by subdomain suffix.
    pub blocked_domains: Vec<String>,
    /// User-Agent string sent by the fetch strategy.
    pub user_agent: String,
    /// Video metadata (oEmbed) endpoint used for best-effort title lookups.
    pub oembed_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        let vault_dir = dirs::document_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Clippings");

        Self {
            vault_dir,
            strategy: RenderStrategy::Browser,
            return_mode: ReturnMode::Markdown,
            save_to_disk: true,
            input_file: None,
            timeout: 30,
            blocked_domains: crate::classify::BLOCKED_DOMAINS.iter().map(|d| (*d).to_string()).collect(),
            user_agent: "Mozilla/5.0 (compatible; Clipvault/0.1; +https://github.com/clipvault/clipvault)"
                .to_string(),
            oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from `CLIPVAULT_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// Recognized variables: `CLIPVAULT_VAULT_DIR`, `CLIPVAULT_STRATEGY`,
    /// `CLIPVAULT_RETURN_MODE`, `CLIPVAULT_SAVE`, `CLIPVAULT_INPUT_FILE`,
    /// `CLIPVAULT_TIMEOUT`, `CLIPVAULT_BLOCKED_DOMAINS` (comma-separated).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("CLIPVAULT_VAULT_DIR") {
            config.vault_dir = PathBuf::from(dir);
        }
        if let Ok(strategy) = std::env::var("CLIPVAULT_STRATEGY")
            && let Ok(parsed) = strategy.parse()
        {
            config.strategy = parsed;
        }
        if let Ok(mode) = std::env::var("CLIPVAULT_RETURN_MODE")
            && let Ok(parsed) = mode.parse()
        {
            config.return_mode = parsed;
        }
        if let Ok(save) = std::env::var("CLIPVAULT_SAVE") {
            config.save_to_disk = !matches!(save.as_str(), "0" | "false" | "no");
        }
        if let Ok(file) = std::env::var("CLIPVAULT_INPUT_FILE") {
            config.input_file = Some(PathBuf::from(file));
        }
        if let Ok(timeout) = std::env::var("CLIPVAULT_TIMEOUT")
            && let Ok(parsed) = timeout.parse()
        {
            config.timeout = parsed;
        }
        if let Ok(domains) = std::env::var("CLIPVAULT_BLOCKED_DOMAINS") {
            config.blocked_domains = parse_domain_list(&domains);
        }

        config
    }
}

fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}
