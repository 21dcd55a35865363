//! Partial Schema CLI
//!
//! Command-line interface for deriving partial variants of JSON Schema models.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use partial_schema::{
    derive_partial, load_schema_auto, to_json_schema, ModelRef, PartialOptions, SchemaModels,
};

#[derive(Parser)]
#[command(name = "partial-schema")]
#[command(about = "Derive partial variants of JSON Schema models")]
#[command(version)]
struct Cli {
    /// Log derivation steps to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a partial model and print it as JSON Schema
    Derive {
        #[command(flatten)]
        target: Target,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the fields of a derived partial model
    Fields {
        #[command(flatten)]
        target: Target,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Schema source: file path or URL (http:// or https://)
    schema: String,

    /// Model to derive from: root title or $defs name (default: root)
    #[arg(long, short)]
    model: Option<String>,

    /// Field selector: name, dotted path (address.city) or wildcard (address.*).
    /// Repeatable; none means every field
    #[arg(long = "field", short = 'f', value_name = "SELECTOR")]
    fields: Vec<String>,

    /// Also make every nested model fully partial
    #[arg(long, short)]
    recursive: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Derive {
            target,
            output,
            pretty,
        } => run_derive(&target, output, pretty),
        Commands::Fields { target, json } => run_fields(&target, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("partial_schema=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the schema, pick the model and derive its partial variant.
fn derive_target(target: &Target) -> Result<ModelRef, u8> {
    let schema = load_schema_auto(&target.schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let base = SchemaModels::from_json_schema(&schema)
        .and_then(|models| models.select(target.model.as_deref()))
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let options = PartialOptions::new(target.fields.iter().cloned()).recursive(target.recursive);
    derive_partial(&base, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_derive(target: &Target, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let derived = derive_target(target)?;
    let schema = to_json_schema(&derived);

    let json_output = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct FieldRow {
    name: String,
    annotation: Option<String>,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_factory: Option<String>,
}

fn run_fields(target: &Target, json_output: bool) -> Result<(), u8> {
    let derived = derive_target(target)?;

    let rows: Vec<FieldRow> = derived
        .fields()
        .map(|(name, info)| FieldRow {
            name: name.to_string(),
            annotation: info.annotation().map(ToString::to_string),
            required: info.is_required(),
            default: info.default().cloned(),
            default_factory: info.default_factory().map(|f| f.name().to_string()),
        })
        .collect();

    if json_output {
        let output = serde_json::json!({
            "model": derived.name(),
            "fields": rows
        });
        println!("{}", output);
        return Ok(());
    }

    println!("{}", derived.name());
    for row in &rows {
        let annotation = row.annotation.as_deref().unwrap_or("?");
        let suffix = match (&row.default, &row.default_factory) {
            (Some(default), _) => format!(" = {}", default),
            (None, Some(factory)) => format!(" = {}()", factory),
            (None, None) if row.required => " (required)".to_string(),
            (None, None) => String::new(),
        };
        println!("  {}: {}{}", row.name, annotation, suffix);
    }

    Ok(())
}
