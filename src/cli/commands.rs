//! CLI command implementations
//!
//! Every command loads the schema directory first, then works on one
//! document through a column binding, exactly as a mapped column would.

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::column::{bind_with, ColumnBinding, ColumnOptions};
use crate::schema::{SchemaKind, SchemaLoader};

use super::args::{Command, DocumentArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_document, write_error, write_response};

/// Column name used for ad-hoc documents.
const DOCUMENT_COLUMN: &str = "document";

/// Main CLI entry point
///
/// Installs logging, parses arguments and dispatches to the command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(ref e) = result {
        write_error(e)?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let data = match cmd {
        Command::Check(args) => check(&args)?,
        Command::Normalize(args) => normalize(&args)?,
        Command::Schemas { schemas } => list_schemas(&schemas)?,
    };
    write_response(data)
}

/// Validates a document, returning the name of the schema it resolved to.
pub fn check(args: &DocumentArgs) -> CliResult<Value> {
    let (binding, document) = prepare(args)?;
    let form = binding.coerce(&document)?;
    Ok(json!({
        "valid": true,
        "schema": form.schema_name(),
    }))
}

/// Validates a document and returns its canonical serialized form.
///
/// Unknown keys are dropped, defaults filled in and absent optional fields
/// written as null.
pub fn normalize(args: &DocumentArgs) -> CliResult<Value> {
    let (binding, document) = prepare(args)?;
    let form = binding.coerce(&document)?;
    Ok(binding.adapter().serialize(&form)?)
}

/// Lists every declared schema with its kind and, for variants, its tag.
pub fn list_schemas(schema_dir: &Path) -> CliResult<Value> {
    let loader = load(schema_dir)?;
    let schemas: Vec<Value> = loader
        .schemas()
        .map(|schema| {
            let kind = match schema.kind() {
                SchemaKind::Concrete => "concrete",
                SchemaKind::Abstract => "abstract",
            };
            json!({
                "name": schema.name(),
                "kind": kind,
                "parent": schema.parent(),
                "tag": schema.tag(),
                "fields": schema.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(json!({ "schemas": schemas }))
}

fn prepare(args: &DocumentArgs) -> CliResult<(ColumnBinding, Value)> {
    let loader = load(&args.schemas)?;
    let target = loader
        .target(&args.schema)
        .ok_or_else(|| CliError::unknown_schema(&args.schema))?;
    let binding = bind_with(DOCUMENT_COLUMN, target, ColumnOptions::default())?;
    let document = read_document(args.document.as_deref())?;
    Ok((binding, document))
}

fn load(schema_dir: &Path) -> CliResult<SchemaLoader> {
    let mut loader = SchemaLoader::new(schema_dir);
    loader.load_all()?;
    debug!(schemas = loader.schema_count(), "schema directory loaded");
    Ok(loader)
}
