//! HTTP Expectations - CLI Entry Point
//!
//! Validates expectation files and dry-runs requests against them.

use anyhow::{Context, Result};
use clap::Parser;
use http_expectations::{
    ExpectationsConfig, HttpRequest, HttpResponseProvider, Method, SimpleResponseProvider,
    CONTENT_TYPE,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "http-expectations",
    about = "In-memory HTTP response provider - validate expectation files and dry-run requests",
    version
)]
struct Args {
    /// Path to expectations file
    #[arg(short, long, default_value = "expectations.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print a sample expectations file and exit
    #[arg(long)]
    print_config: bool,

    /// Validate expectations and exit
    #[arg(long)]
    validate: bool,

    /// Method of the request to dry-run
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Path of the request to dry-run
    #[arg(short, long)]
    path: Option<String>,

    /// Content type header of the request to dry-run
    #[arg(long)]
    content_type: Option<String>,

    /// Body of the request to dry-run
    #[arg(short, long)]
    body: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-expectations.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading expectations");
        ExpectationsConfig::from_file(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else if args.validate {
        anyhow::bail!("Expectations file not found: {:?}", args.config);
    } else {
        info!("Using empty configuration (no expectations)");
        ExpectationsConfig::default()
    };

    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} expectations defined)",
            config.expectations.len()
        );
        return Ok(());
    }

    let provider = SimpleResponseProvider::from_config(&config)?;

    let Some(path) = args.path else {
        println!(
            "{} expectations loaded; pass --path to dry-run a request",
            provider.expectation_count()
        );
        return Ok(());
    };

    let method: Method = args.method.parse()?;
    let mut request = HttpRequest::new(method, path);
    if let Some(content_type) = args.content_type {
        request = request.header(CONTENT_TYPE, content_type);
    }
    if let Some(body) = args.body {
        request = request.content(body);
    }

    match provider.get_response(&request) {
        Some(response) => {
            println!("{} -> {}", request, response.status());
            if let Some(content_type) = response.content_type() {
                println!("{}: {}", CONTENT_TYPE, content_type);
            }
            if let Some(content) = response.content() {
                println!();
                println!("{}", String::from_utf8_lossy(content));
            }
        }
        None => println!("{} -> no matching expectation", request),
    }

    if let Err(report) = provider.verify() {
        println!();
        println!("{}", report);
    }

    Ok(())
}
