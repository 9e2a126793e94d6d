//! `webpeel` — a thin command-line front end over [`webpeel_pipeline::Pipeline`].
//!
//! Unlike the teacher crate's CLI, which is an HTTP client for a separately
//! running API server, this binary embeds the pipeline in-process: there is
//! no server half to this spec, so there is nothing for the CLI to dial
//! (see DESIGN.md).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use webpeel_config::WebPeelConfig;
use webpeel_fetch::browser::BrowserEngine;
use webpeel_pipeline::Pipeline;
use webpeel_types::options::Format;
use webpeel_types::PeelOptions;

#[derive(Parser)]
#[command(name = "webpeel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract clean, LLM-ready content from a URL", long_about = None)]
struct Cli {
    /// URL to extract.
    url: String,

    /// Output format.
    #[arg(long, value_enum, default_value = "markdown")]
    format: CliFormat,

    /// Force a headless browser render instead of the simple HTTP tier.
    #[arg(long)]
    render: bool,

    /// Escalate straight to the stealth tier.
    #[arg(long)]
    stealth: bool,

    /// Capture a screenshot (implies --render).
    #[arg(long)]
    screenshot: bool,

    /// Soft token budget for BM25-ranked distillation.
    #[arg(long)]
    budget: Option<u32>,

    /// Hard token ceiling applied after distillation.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Ask a question; returns a lexical quick answer alongside the content.
    #[arg(long)]
    question: Option<String>,

    /// Run the readability extractor and include it in the output.
    #[arg(long)]
    readable: bool,

    /// Track content changes against the previous fingerprint for this URL.
    #[arg(long)]
    change_tracking: bool,

    /// Extract a computed branding profile (requires --render).
    #[arg(long)]
    branding: bool,

    /// Include discovered image URLs in the output.
    #[arg(long)]
    images: bool,

    /// Split the final content into BM25-ranked passages.
    #[arg(long)]
    chunk: bool,

    /// Pretty-print the full result as JSON instead of just the content.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Markdown,
    Text,
    Html,
    Clean,
}

impl From<CliFormat> for Format {
    fn from(f: CliFormat) -> Self {
        match f {
            CliFormat::Markdown => Format::Markdown,
            CliFormat::Text => Format::Text,
            CliFormat::Html => Format::Html,
            CliFormat::Clean => Format::Clean,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();
}

/// `webpeel-fetch`'s `headless` feature is on by default, so the
/// chromiumoxide-backed engine is always available here.
async fn build_browser(needs_render: bool) -> Option<Arc<dyn BrowserEngine>> {
    if !needs_render {
        return None;
    }
    match webpeel_fetch::browser::chromiumoxide_impl::ChromiumoxideEngine::launch(None).await {
        Ok(engine) => Some(Arc::new(engine) as Arc<dyn BrowserEngine>),
        Err(e) => {
            tracing::warn!(error = %e, "failed to launch headless browser, falling back to simple tier");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = WebPeelConfig::from_env().context("loading configuration from environment")?;
    let needs_render = cli.render || cli.stealth || cli.screenshot || cli.branding;
    let browser = build_browser(needs_render).await;
    let pipeline = Pipeline::new(config, browser);

    let options = PeelOptions {
        render: cli.render,
        stealth: cli.stealth,
        screenshot: cli.screenshot,
        budget: cli.budget,
        max_tokens: cli.max_tokens,
        question: cli.question,
        readable: cli.readable,
        change_tracking: cli.change_tracking,
        branding: cli.branding,
        images: cli.images,
        chunk: cli.chunk,
        format: cli.format.into(),
        ..PeelOptions::default()
    };

    let result = pipeline.peel(&cli.url, options).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if let Some(title) = &result.title {
            eprintln!("# {title}");
        }
        println!("{}", result.content);
        for warning in &result.warnings {
            eprintln!("warning: {warning}");
        }
        if let Some(answer) = &result.quick_answer {
            eprintln!("\nquick answer ({:.2} confidence): {}", answer.confidence, answer.answer);
        }
    }

    Ok(())
}
