//! storyfeed: publish one generated short story into an RSS feed.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐  JSON   ┌───────────┐  content  ┌───────────┐  item  ┌──────────────┐
//! │ source/   │ ──────► │ extract/  │ ────────► │ publish   │ ─────► │ feed/store   │ ──► feed.xml
//! │ (fetch)   │         │ (shapes)  │           │ (sequence)│        │ (atomic I/O) │
//! └───────────┘         └───────────┘           └───────────┘        └──────────────┘
//!                                                     │
//!                                          slug + timestamp helpers
//! ```
//!
//! * **`source/`**: the `ContentSource` trait and concrete implementations
//!   (OpenAI Responses, OpenAI Chat, saved response file).
//! * **`extract/`**: finds title, story HTML and image prompt in whatever
//!   shape the source returned.
//! * **`feed/`**: the feed item type, the store that owns `feed.xml`, and the
//!   per-post HTML pages.
//! * **`publish`**: runs one fetch → extract → append cycle.
//! * **`config`**: defaults, TOML file and environment overrides.
//! * **`main`**: parses args, sets up logging, and wires everything together.
//!
//! The binary does one run and exits; schedule it with cron or a CI timer.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use storyfeed::config::Config;
use storyfeed::extract::Extractor;
use storyfeed::feed::FeedStore;
use storyfeed::publish::{PublishReport, Publisher};
use storyfeed::source::{Api, ContentSource, FileSource, OpenAiSource};
use storyfeed::PublishError;

/// Set by GitHub Actions; the run summary is appended to this file.
const ENV_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed file to append to (overrides config)
    #[arg(short, long)]
    feed: Option<PathBuf>,

    /// Maximum number of items kept in the feed (overrides config)
    #[arg(short, long)]
    max_items: Option<usize>,

    /// Use a saved provider response instead of calling the API
    #[arg(short, long)]
    response_file: Option<PathBuf>,

    /// Illustration URL to embed under the story
    #[arg(short, long)]
    image_url: Option<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyfeed=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(feed) = &args.feed {
        config.feed.path = feed.clone();
    }
    if let Some(max) = args.max_items {
        config.feed.max_items = max;
    }
    config.validate()?;
    Ok(config)
}

/// The saved response when one is given, otherwise Responses then Chat.
fn build_sources(args: &Args, config: &Config) -> Result<Vec<Box<dyn ContentSource>>> {
    let sources: Vec<Box<dyn ContentSource>> = match &args.response_file {
        Some(path) => vec![Box::new(FileSource::new(path))],
        None => vec![
            Box::new(OpenAiSource::new(Api::Responses, &config.provider)?),
            Box::new(OpenAiSource::new(Api::ChatCompletions, &config.provider)?),
        ],
    };
    Ok(sources)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args).context("loading configuration")?;
    let sources = build_sources(&args, &config)?;

    let mut store = FeedStore::open(&config.feed.path, config.feed.store_settings())?;
    let extractor = Extractor::new(&config.extractor);
    debug!(shapes = ?extractor.matcher_names(), "extractor ready");
    let publisher = Publisher::new(sources, extractor).with_pages(config.feed.post_pages());

    let report = publisher.publish(&mut store, chrono::Utc::now(), args.image_url.as_deref())?;

    if let Some(path) = std::env::var_os(ENV_STEP_SUMMARY).filter(|p| !p.is_empty()) {
        // The post is already out; a missing summary is not worth failing for.
        if let Err(e) = append_step_summary(Path::new(&path), &report) {
            warn!(path = ?path, error = %e, "could not write job summary");
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn append_step_summary(path: &Path, report: &PublishReport) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(report.to_markdown().as_bytes())
}

fn main() -> ExitCode {
    // -- environment ---------------------------------------------------------
    // A missing .env is normal outside local development.
    let _ = dotenvy::dotenv();
    init_tracing();

    // -- one publish run -----------------------------------------------------
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let stage = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<PublishError>())
                .map(PublishError::stage)
                .unwrap_or("run");
            eprintln!("storyfeed: {stage} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
