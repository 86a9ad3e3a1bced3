pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod render;
pub mod video;

pub use classify::{
    BLOCKED_DOMAINS, Classification, PROCESSED_MARKER, canonical_task, classify, classify_with, is_already_processed,
};
pub use config::{Config, RenderStrategy, ReturnMode};
pub use document::{
    DocumentFields, build_document, build_stub, build_video_embed, rewrite_image_paths, sanitize_filename, today,
};
pub use error::{ClipvaultError, Result};
pub use extract::{ContentExtractor, Extraction, ReadabilityExtractor};
pub use pipeline::{BatchOptions, BatchOutput, BatchResult, Pipeline, StructuredDocument};
pub use render::{
    BrowserRenderer, ChromiumLauncher, HttpFetcher, PageRenderer, RenderHandle, RenderedPage, RendererLauncher,
};
pub use video::VideoLink;
