use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clipvault_core::{BatchOptions, Config, Pipeline, RenderStrategy, ReturnMode};
use owo_colors::OwoColorize;

mod watch;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Clip web articles into a Markdown knowledge base
#[derive(Parser, Debug)]
#[command(name = "clipvault")]
#[command(version = VERSION)]
#[command(about = "Extract readable web content into frontmatter-annotated Markdown", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Vault directory for clipped documents
    #[arg(long, global = true, value_name = "DIR")]
    vault_dir: Option<PathBuf>,

    /// Render strategy (browser, fetch)
    #[arg(short, long, global = true, value_name = "STRATEGY")]
    strategy: Option<RenderStrategy>,

    /// Return mode (markdown, structured)
    #[arg(short, long, global = true, value_name = "MODE")]
    format: Option<ReturnMode>,

    /// Do not write documents to the vault
    #[arg(long, global = true)]
    no_save: bool,

    /// Per-attempt timeout in seconds
    #[arg(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clip one or more links directly
    Clip {
        /// Links to process
        #[arg(value_name = "LINK", required = true)]
        links: Vec<String>,
    },
    /// Process the links in a file once, rewriting processed markers
    Run {
        /// Input file containing one link per line
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Watch a file and process new links as they appear
    Watch {
        /// Input file containing one link per line
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Poll interval in seconds
        #[arg(long, default_value = "5", value_name = "SECS")]
        interval: u64,
    },
}

fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

fn print_skip(message: &str) {
    eprintln!("{} {}", "·".dimmed(), message.dimmed());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "clipvault=debug" } else { "clipvault=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env();
    if let Some(dir) = args.vault_dir {
        config.vault_dir = dir;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(mode) = args.format {
        config.return_mode = mode;
    }
    if args.no_save {
        config.save_to_disk = false;
    }
    config.timeout = args.timeout;

    let options = BatchOptions::from_config(&config);
    let mut pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    match args.command {
        Command::Clip { links } => clip(&mut pipeline, &links, &options).await,
        Command::Run { file } => {
            let processed = watch::process_file(&mut pipeline, &file, &options)
                .await
                .with_context(|| format!("Failed to process {}", file.display()))?;
            if processed == 0 {
                print_info("Nothing new to clip");
            } else {
                print_success(&format!("Clipped {} link(s)", processed));
            }
            Ok(())
        }
        Command::Watch { file, interval } => watch::watch_file(&mut pipeline, &file, interval, &options).await,
    }
}

async fn clip(pipeline: &mut Pipeline, links: &[String], options: &BatchOptions) -> anyhow::Result<()> {
    let result = pipeline
        .process_batch(links, options, |_, line| {
            if line.starts_with(clipvault_core::PROCESSED_MARKER) {
                print_success(line.trim_start_matches(clipvault_core::PROCESSED_MARKER));
            } else {
                print_skip(line);
            }
        })
        .await
        .context("Batch failed")?;

    if !options.save {
        match result.output {
            clipvault_core::BatchOutput::Markdown(docs) => {
                for doc in docs.iter().filter(|d| !d.is_empty()) {
                    println!("{}", doc);
                }
            }
            clipvault_core::BatchOutput::Structured(docs) => {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            }
        }
    }

    Ok(())
}
