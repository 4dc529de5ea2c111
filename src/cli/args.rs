//! CLI argument definitions using clap
//!
//! Commands:
//! - formcol check --schemas <dir> --schema <name> [--document <file>]
//! - formcol normalize --schemas <dir> --schema <name> [--document <file>]
//! - formcol schemas --schemas <dir>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// formcol - validate and normalize JSON documents against form schemas
#[derive(Parser, Debug)]
#[command(name = "formcol")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a document and report the schema it resolved to
    Check(DocumentArgs),

    /// Validate a document and print its canonical serialized form
    Normalize(DocumentArgs),

    /// List declared schemas
    Schemas {
        /// Directory of schema declaration files
        #[arg(long, default_value = "./schemas")]
        schemas: PathBuf,
    },
}

/// Arguments shared by commands that read one document.
#[derive(Args, Debug)]
pub struct DocumentArgs {
    /// Directory of schema declaration files
    #[arg(long, default_value = "./schemas")]
    pub schemas: PathBuf,

    /// Schema or abstract family name to validate against
    #[arg(long)]
    pub schema: String,

    /// Document to read; stdin when omitted
    #[arg(long)]
    pub document: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
