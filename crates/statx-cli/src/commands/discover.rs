//! Discover command - walk the schema tree into the on-disk cache.

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;

use statx_client::{Credentials, Endpoints, HttpTransport, NodeType, SchemaCache, SchemaWalker};

use crate::{Config, OutputFormat};

/// Arguments for the discover command.
#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Schema URL to start from (defaults to the schema endpoint root).
    #[arg(long)]
    pub root_url: Option<String>,

    /// Node type to expand, repeatable (defaults to FOLDER, DATABASE,
    /// MEASURE, and FIELD).
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<NodeType>,

    /// Reuse children already in the cache file instead of refetching them.
    #[arg(long)]
    pub use_cache: bool,
}

/// Execute the discover command.
///
/// # Errors
///
/// Returns an error if the API key is missing, the root fetch fails, or
/// the cache file cannot be written.
pub async fn execute(args: DiscoverArgs, config: &Config) -> Result<()> {
    let api_key = config
        .api_key
        .as_ref()
        .context("An API key is required. Set STATX_API_KEY or use --api-key")?;

    let endpoints = Endpoints::for_base(&config.base_url);
    let root_url = args
        .root_url
        .clone()
        .unwrap_or_else(|| endpoints.schema().to_string());
    let transport = HttpTransport::new(endpoints, Credentials::new(api_key));

    let mut cache = if args.use_cache {
        crate::commands::load_cache_or_empty(&config.cache_path)
    } else {
        SchemaCache::new()
    };

    let mut walker = SchemaWalker::new()
        .with_persist_path(&config.cache_path)
        .with_read_cache(args.use_cache);
    if !args.types.is_empty() {
        walker = walker.with_allowed_types(args.types.iter().copied());
    }

    let stats = walker
        .discover(&transport, &root_url, &mut cache)
        .await
        .with_context(|| format!("schema discovery from {root_url} failed"))?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Text | OutputFormat::Csv => {
            println!("{}", "Schema discovery complete.".green());
            println!();
            println!("  Nodes recorded:  {}", stats.nodes_recorded);
            println!("  Nodes expanded:  {}", stats.nodes_expanded);
            println!("  Cache hits:      {}", stats.cache_hits);
            println!("  Waves:           {}", stats.waves);
            if stats.fetch_failures > 0 {
                println!(
                    "  Fetch failures:  {}",
                    stats.fetch_failures.to_string().red()
                );
            } else {
                println!("  Fetch failures:  {}", stats.fetch_failures);
            }
            println!();
            println!("Cache written to {}", config.cache_path.display());
        }
    }

    Ok(())
}
