//! The link processing pipeline.
//!
//! Orchestrates classification, strategy selection, extraction, fallback,
//! document building, persistence, and result aggregation over a batch of
//! raw input lines. Tasks run strictly in input order, one at a time; the
//! shared browser handle is created lazily on the first render task of a
//! batch and torn down before control returns to the caller.
//!
//! Callers must not run two batches on the same pipeline concurrently; the
//! pipeline takes `&mut self` so the compiler enforces that contract.

use std::path::PathBuf;

use serde::Serialize;

use crate::classify::{self, Classification, PROCESSED_MARKER};
use crate::config::{Config, RenderStrategy, ReturnMode};
use crate::document::{self, DocumentFields};
use crate::extract::{ContentExtractor, ReadabilityExtractor};
use crate::render::{ChromiumLauncher, HttpFetcher, PageRenderer, RenderHandle, RendererLauncher};
use crate::video;
use crate::{ClipvaultError, Result};

/// Per-batch options, each defaulting to the pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub mode: ReturnMode,
    pub strategy: RenderStrategy,
    pub save: bool,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self { mode: config.return_mode, strategy: config.strategy, save: config.save_to_disk }
    }
}

/// One structured result record for a produced document.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredDocument {
    pub url: String,
    pub frontmatter: serde_json::Value,
    pub body: String,
}

/// Per-line results in the caller's requested shape.
///
/// Markdown mode yields one string per input line, empty for skipped
/// lines; structured mode omits skipped lines entirely.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchOutput {
    Markdown(Vec<String>),
    Structured(Vec<StructuredDocument>),
}

/// Aggregate of one pipeline run over N input lines.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Updated marker lines, same length and order as the input.
    pub lines: Vec<String>,
    pub output: BatchOutput,
}

enum TaskOutcome {
    /// Line stays as authored; no document produced.
    Skip,
    /// A document was built; the line gets the processed marker.
    Produced { marker_url: String, fields: DocumentFields, body: String },
}

/// The link processing pipeline.
///
/// Owns the adapter boundaries: a content extractor, a fetch-strategy
/// renderer, and a launcher for the shared browser handle.
pub struct Pipeline {
    config: Config,
    extractor: Box<dyn ContentExtractor>,
    fetcher: HttpFetcher,
    launcher: Box<dyn RendererLauncher>,
}

impl Pipeline {
    /// Creates a pipeline with the default adapters.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        let launcher = Box::new(ChromiumLauncher::new(config.clone()));
        Ok(Self { config, extractor: Box::new(ReadabilityExtractor), fetcher, launcher })
    }

    /// Creates a pipeline with custom adapters.
    ///
    /// This is the seam for embedding a different extractor or renderer;
    /// tests use it to run batches without a browser or network.
    pub fn with_adapters(
        config: Config,
        extractor: Box<dyn ContentExtractor>,
        launcher: Box<dyn RendererLauncher>,
    ) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self { config, extractor, fetcher, launcher })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes a batch of raw input lines.
    ///
    /// Lines are classified up front; the browser is launched only when the
    /// chosen strategy needs it and at least one task will render. A
    /// failure to launch fails the whole batch; every per-task error is
    /// contained at the task boundary. `on_item` observes `(index, updated
    /// line)` for every line as it completes, in input order.
    pub async fn process_batch<F>(
        &mut self,
        lines: &[String],
        options: &BatchOptions,
        mut on_item: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(usize, &str),
    {
        let classified: Vec<Classification> =
            lines.iter().map(|l| classify::classify_with(l, &self.config.blocked_domains)).collect();

        let needs_browser =
            options.strategy == RenderStrategy::Browser && classified.iter().any(Classification::is_render_task);
        let browser = if needs_browser { Some(self.launcher.launch().await?) } else { None };

        let mut markers = Vec::with_capacity(lines.len());
        let mut markdown_docs = Vec::new();
        let mut structured_docs = Vec::new();

        // No `?` below this point until the browser is closed: per-task
        // errors become Skip or a stub, so teardown always runs.
        for (index, (line, classification)) in lines.iter().zip(&classified).enumerate() {
            let outcome = self.process_task(classification, browser.as_deref(), options).await;

            let updated = match outcome {
                TaskOutcome::Skip => {
                    if options.mode == ReturnMode::Markdown {
                        markdown_docs.push(String::new());
                    }
                    line.clone()
                }
                TaskOutcome::Produced { marker_url, fields, body } => {
                    let doc = document::build_document(&fields, &body);

                    let persisted = if options.save { self.persist(&fields.title, &doc) } else { Ok(None) };
                    match persisted {
                        Ok(path) => {
                            if let Some(path) = path {
                                tracing::debug!(path = %path.display(), "Wrote document");
                            }
                            match options.mode {
                                ReturnMode::Markdown => markdown_docs.push(doc),
                                ReturnMode::Structured => structured_docs.push(StructuredDocument {
                                    url: fields.url.clone(),
                                    frontmatter: fields.to_json(),
                                    body,
                                }),
                            }
                            format!("{}{}", PROCESSED_MARKER, marker_url)
                        }
                        Err(e) => {
                            // Persistence failure is fatal for this task
                            // only; the line stays retryable.
                            tracing::error!(url = marker_url, error = %e, "Failed to persist document");
                            if options.mode == ReturnMode::Markdown {
                                markdown_docs.push(String::new());
                            }
                            line.clone()
                        }
                    }
                }
            };

            on_item(index, &updated);
            markers.push(updated);
        }

        if let Some(browser) = browser {
            browser.close().await;
        }

        let output = match options.mode {
            ReturnMode::Markdown => BatchOutput::Markdown(markdown_docs),
            ReturnMode::Structured => BatchOutput::Structured(structured_docs),
        };
        Ok(BatchResult { lines: markers, output })
    }

    async fn process_task(
        &self,
        classification: &Classification,
        browser: Option<&dyn RenderHandle>,
        options: &BatchOptions,
    ) -> TaskOutcome {
        match classification {
            Classification::AlreadyProcessed
            | Classification::NonUrl
            | Classification::BlockedDomain { .. }
            | Classification::NonDocumentExtension { .. } => {
                tracing::debug!(?classification, "Skipping line");
                TaskOutcome::Skip
            }
            Classification::VideoSingle { id, canonical } => self.process_video(id, canonical).await,
            Classification::VideoCollection { url } | Classification::Eligible { url } => {
                self.process_render(url, browser, options).await
            }
        }
    }

    /// Builds the metadata-only embed for a single video link. The title
    /// lookup is best-effort and never blocks the pipeline.
    async fn process_video(&self, id: &str, canonical: &str) -> TaskOutcome {
        let title = video::lookup_title(self.fetcher.client(), &self.config.oembed_endpoint, canonical)
            .await
            .unwrap_or_else(|| "Untitled Video".to_string());

        let (fields, body) = document::build_video_embed(&title, canonical, id);
        TaskOutcome::Produced { marker_url: canonical.to_string(), fields, body }
    }

    async fn process_render(
        &self,
        url: &str,
        browser: Option<&dyn RenderHandle>,
        options: &BatchOptions,
    ) -> TaskOutcome {
        match options.strategy {
            RenderStrategy::Fetch => match self.attempt(&self.fetcher, url).await {
                Ok((fields, body)) => TaskOutcome::Produced { marker_url: url.to_string(), fields, body },
                Err(e) => {
                    // Direct-fetch failures are assumed to mean the
                    // resource is unreachable; leave the line retryable.
                    tracing::debug!(url, error = %e, "Fetch strategy failed, leaving line unmarked");
                    TaskOutcome::Skip
                }
            },
            RenderStrategy::Browser => {
                let Some(renderer) = browser else {
                    tracing::warn!(url, "No browser handle for a render task, skipping");
                    return TaskOutcome::Skip;
                };

                match self.attempt(renderer, url).await {
                    Ok((fields, body)) => TaskOutcome::Produced { marker_url: url.to_string(), fields, body },
                    Err(ClipvaultError::NotHtml(content_type)) => {
                        tracing::debug!(url, content_type, "Not an HTML document, skipping");
                        TaskOutcome::Skip
                    }
                    Err(e) => {
                        tracing::warn!(url, error = %e, "Render failed, falling back to direct fetch");
                        match self.attempt(&self.fetcher, url).await {
                            Ok((fields, body)) => {
                                TaskOutcome::Produced { marker_url: url.to_string(), fields, body }
                            }
                            Err(e) => {
                                // Stub-on-failure: mark the line processed so
                                // permanently broken links are not retried
                                // forever.
                                tracing::warn!(url, error = %e, "Fallback failed, producing stub document");
                                let (fields, body) = document::build_stub(url);
                                TaskOutcome::Produced { marker_url: url.to_string(), fields, body }
                            }
                        }
                    }
                }
            }
        }
    }

    /// One extraction attempt via the given renderer.
    async fn attempt<R>(&self, renderer: &R, url: &str) -> Result<(DocumentFields, String)>
    where
        R: PageRenderer + ?Sized,
    {
        let page = renderer.fetch_rendered(url).await?;
        let extraction = self.extractor.extract(&page.html, &page.final_url)?;
        let body = document::rewrite_image_paths(&extraction.markdown, &page.final_url);
        let fields = DocumentFields::from_extraction(&extraction, url);
        Ok((fields, body))
    }

    fn persist(&self, title: &str, doc: &str) -> Result<Option<PathBuf>> {
        std::fs::create_dir_all(&self.config.vault_dir)?;
        let path = self
            .config
            .vault_dir
            .join(format!("{}.md", document::sanitize_filename(title)));
        std::fs::write(&path, doc)?;
        Ok(Some(path))
    }
}
