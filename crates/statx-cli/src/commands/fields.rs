//! Fields command - list the fields of a database.

use anyhow::{Context, Result};
use clap::Args;

use statx_client::{
    Credentials, Endpoints, HttpTransport, SchemaLookup, StaticTransport, Transport,
};

use crate::{Config, OutputFormat};

/// Arguments for the fields command.
#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Database id, e.g. `str:database:UC_Monthly`.
    pub database_id: String,

    /// Resolve from the cache file alone, without calling the API.
    #[arg(long)]
    pub offline: bool,
}

/// Execute the fields command.
///
/// # Errors
///
/// Returns an error if the database is not in the cache, a lookup fetch
/// fails, or (online) the API key is missing.
pub async fn execute(args: FieldsArgs, config: &Config) -> Result<()> {
    let mut cache = crate::commands::load_cache_or_empty(&config.cache_path);

    let transport: Box<dyn Transport> = if args.offline {
        // An empty transport turns every fetch into an error, so only the
        // cache can answer.
        Box::new(StaticTransport::new())
    } else {
        let api_key = config.api_key.as_ref().context(
            "An API key is required. Set STATX_API_KEY, use --api-key, or pass --offline",
        )?;
        Box::new(HttpTransport::new(
            Endpoints::for_base(&config.base_url),
            Credentials::new(api_key),
        ))
    };

    let mut lookup = SchemaLookup::new(transport.as_ref(), &mut cache);
    let fields = lookup
        .database_fields(&args.database_id)
        .await
        .with_context(|| {
            if args.offline {
                format!(
                    "could not resolve fields for '{}' from the cache alone; run discover first or drop --offline",
                    args.database_id
                )
            } else {
                format!("could not resolve fields for '{}'", args.database_id)
            }
        })?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["label", "id"])?;
            for (label, id) in &fields {
                writer.write_record([label.as_str(), id.as_str()])?;
            }
            let bytes = writer.into_inner().map_err(|e| e.into_error())?;
            print!("{}", String::from_utf8(bytes)?);
        }
        OutputFormat::Text => {
            if fields.is_empty() {
                println!("No fields found for {}", args.database_id);
                return Ok(());
            }
            println!("Fields of {}:", args.database_id);
            println!();
            let width = fields.keys().map(String::len).max().unwrap_or(0);
            for (label, id) in &fields {
                println!("  {label:<width$}  {id}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: FieldsArgs,
    }

    #[test]
    fn test_fields_args_parse() {
        let cli = TestCli::try_parse_from(["test", "str:database:UC_Monthly"]).unwrap();
        assert_eq!(cli.args.database_id, "str:database:UC_Monthly");
        assert!(!cli.args.offline);
    }

    #[test]
    fn test_fields_args_offline_flag() {
        let cli = TestCli::try_parse_from(["test", "str:database:PIP", "--offline"]).unwrap();
        assert!(cli.args.offline);
    }

    #[test]
    fn test_fields_args_require_database_id() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }
}
