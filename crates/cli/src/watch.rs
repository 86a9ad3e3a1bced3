//! File-based input: single-shot processing and the watch loop.
//!
//! The watch loop polls the input file's modification time. Rewriting the
//! file after a batch would itself look like a change, so cycles triggered
//! within a short debounce window of the pipeline's own last write are
//! suppressed.

use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Context;
use clipvault_core::{BatchOptions, Pipeline};

/// How long after our own rewrite a file change is ignored.
const WRITE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Processes every line of `path` once and rewrites the file when any
/// marker changed. Returns the number of newly processed lines.
pub async fn process_file(pipeline: &mut Pipeline, path: &Path, options: &BatchOptions) -> anyhow::Result<usize> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let lines: Vec<String> = contents.lines().map(str::to_string).collect();

    let result = pipeline
        .process_batch(&lines, options, |index, line| {
            tracing::debug!(index, line, "Line completed");
        })
        .await
        .context("Batch failed")?;

    let processed = result.lines.iter().zip(&lines).filter(|(new, old)| new != old).count();

    if processed > 0 {
        let mut updated = result.lines.join("\n");
        if contents.ends_with('\n') {
            updated.push('\n');
        }
        std::fs::write(path, updated).with_context(|| format!("Failed to rewrite {}", path.display()))?;
    }

    Ok(processed)
}

/// Polls `path` every `interval` seconds and processes it whenever its
/// modification time moves, subject to the write debounce.
pub async fn watch_file(
    pipeline: &mut Pipeline,
    path: &Path,
    interval: u64,
    options: &BatchOptions,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut last_seen: Option<SystemTime> = None;
    let mut last_write: Option<Instant> = None;

    eprintln!("Watching {} (every {}s)", path.display(), interval.max(1));

    loop {
        ticker.tick().await;

        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Input file unavailable");
                continue;
            }
        };

        if last_seen == Some(modified) {
            continue;
        }

        // Our own rewrite bumps the mtime; swallow the echo.
        if let Some(written) = last_write
            && written.elapsed() < WRITE_DEBOUNCE
        {
            last_seen = Some(modified);
            continue;
        }

        last_seen = Some(modified);
        match process_file(pipeline, path, options).await {
            Ok(0) => {}
            Ok(count) => {
                last_write = Some(Instant::now());
                // Pick up the mtime of our own write so the next tick
                // does not re-trigger.
                if let Ok(m) = std::fs::metadata(path).and_then(|m| m.modified()) {
                    last_seen = Some(m);
                }
                eprintln!("Clipped {} link(s)", count);
            }
            Err(e) => {
                tracing::error!(error = %e, "Watch cycle failed");
            }
        }
    }
}
