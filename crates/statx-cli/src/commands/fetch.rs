//! Fetch command - fetch a measure as a flat table.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use statx_client::{
    fetch_measure_table, Credentials, DataTable, Endpoints, GeographySelection, HttpTransport,
    RequestOptions, DEFAULT_GEOGRAPHY_FIELD, DEFAULT_GEOGRAPHY_FOLDER, DEFAULT_GEOGRAPHY_LEVEL,
};

use crate::{Config, OutputFormat};

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Measure id, e.g. `str:measure:UC_Monthly:V_F_UC_CASELOAD_FULL`.
    pub measure_id: String,

    /// Field id to break the data down by, repeatable (defaults to every
    /// field of the measure's database).
    #[arg(long = "field", value_name = "FIELD_ID")]
    pub fields: Vec<String>,

    /// Label of the geography folder under the database.
    #[arg(long, default_value = DEFAULT_GEOGRAPHY_FOLDER)]
    pub geo_folder: String,

    /// Label of the geography field under the folder.
    #[arg(long, default_value = DEFAULT_GEOGRAPHY_FIELD)]
    pub geo_field: String,

    /// Label of the geography level whose values are requested.
    #[arg(long, default_value = DEFAULT_GEOGRAPHY_LEVEL)]
    pub geo_level: String,

    /// Leave the total across all geography values out of the request.
    #[arg(long)]
    pub no_total: bool,

    /// Write the table to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Execute the fetch command.
///
/// # Errors
///
/// Returns an error if the API key is missing, the request cannot be
/// built from the cached schema, or the table request or unpacking fails.
pub async fn execute(args: FetchArgs, config: &Config) -> Result<()> {
    let api_key = config
        .api_key
        .as_ref()
        .context("An API key is required. Set STATX_API_KEY or use --api-key")?;

    let transport = HttpTransport::new(
        Endpoints::for_base(&config.base_url),
        Credentials::new(api_key),
    );
    let mut cache = crate::commands::load_cache_or_empty(&config.cache_path);

    let options = RequestOptions {
        geography: GeographySelection {
            folder_label: args.geo_folder.clone(),
            field_label: args.geo_field.clone(),
            level_label: args.geo_level.clone(),
        },
        include_total: !args.no_total,
    };
    let field_ids = if args.fields.is_empty() {
        None
    } else {
        Some(args.fields.as_slice())
    };

    let table = fetch_measure_table(&transport, &mut cache, &args.measure_id, field_ids, &options)
        .await
        .with_context(|| format!("could not fetch measure '{}'", args.measure_id))?;

    let rendered = match config.format {
        OutputFormat::Json => serde_json::to_string_pretty(&table)?,
        OutputFormat::Csv => render_csv(&table)?,
        OutputFormat::Text => render_text(&table),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("could not write {}", path.display()))?;
            println!(
                "Table written to {} ({} rows)",
                path.display(),
                table.rows.len()
            );
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

fn render_csv(table: &DataTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<&str> = table.dimensions.iter().map(String::as_str).collect();
    header.push("value");
    writer.write_record(&header)?;
    for row in &table.rows {
        let mut record = row.labels.clone();
        record.push(row.value.to_string());
        writer.write_record(&record)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn render_text(table: &DataTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} | value", table.dimensions.join(" | "));
    for row in &table.rows {
        let _ = writeln!(out, "{} | {}", row.labels.join(" | "), row.value);
    }
    out
}
