//! # statx-cli
//!
//! Command-line client for the Stat-Xplore statistical-data API.
//!
//! ## Commands
//!
//! - `statx discover` - Walk the schema tree into the on-disk cache
//! - `statx fields` - List the fields of a database
//! - `statx fetch` - Fetch a measure as a flat table
//!
//! ## Configuration
//!
//! Settings come from flags or environment variables:
//!
//! - `STATX_BASE_URL` - API base URL (defaults to the production service)
//! - `STATX_API_KEY` - API key sent with every request
//! - `STATX_SCHEMA_CACHE` - Path of the schema cache file

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use statx_client::DEFAULT_BASE_URL;

/// Stat-Xplore command-line client.
#[derive(Debug, Parser)]
#[command(name = "statx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API base URL.
    #[arg(long, env = "STATX_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API key sent with every request.
    #[arg(long, env = "STATX_API_KEY")]
    pub api_key: Option<String>,

    /// Path of the schema cache file.
    #[arg(long = "cache", env = "STATX_SCHEMA_CACHE", default_value = "schema.csv")]
    pub cache_path: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            cache_path: self.cache_path.clone(),
            format: self.format,
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk the schema tree and persist it to the cache file.
    Discover(commands::discover::DiscoverArgs),
    /// List the fields of a database.
    Fields(commands::fields::FieldsArgs),
    /// Fetch a measure as a flat table.
    Fetch(commands::fetch::FetchArgs),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// CSV output.
    Csv,
}

/// Effective CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL.
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: Option<String>,
    /// Path of the schema cache file.
    pub cache_path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
}
