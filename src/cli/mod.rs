//! CLI module for formcol
//!
//! Provides command-line interface for:
//! - check: Validate a document against a schema or family
//! - normalize: Print a document's canonical serialized form
//! - schemas: List declared schemas

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, DocumentArgs};
pub use commands::{check, list_schemas, normalize, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_document, write_error, write_response};
