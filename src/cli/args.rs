//! CLI argument definitions using clap
//!
//! Commands:
//! - relalg --catalog <dir> tables
//! - relalg --catalog <dir> describe <schema.table>
//! - relalg --catalog <dir> sql <schema.table> [--join T]... [--restrict P]...
//!   [--key-value K=V]... [--proj D]... [--count]

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// relalg - relational algebra over table definitions, printed as SQL
#[derive(Parser, Debug)]
#[command(name = "relalg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory of JSON table definitions
    #[arg(long, global = true, default_value = "./tables")]
    pub catalog: PathBuf,

    /// Path to engine configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List resolved tables and their primary keys
    Tables,

    /// Print the heading of a table, with lineage
    Describe {
        /// Table as schema.table
        table: String,
    },

    /// Build an expression and print its SQL
    Sql {
        /// Base table as schema.table
        table: String,

        /// Join another table (applied in order, before restrictions)
        #[arg(long = "join")]
        join: Vec<String>,

        /// Restrict by an SQL predicate
        #[arg(long = "restrict")]
        restrict: Vec<String>,

        /// Restrict by attribute equality, NAME=VALUE (VALUE is JSON or text)
        #[arg(long = "key-value", value_parser = parse_key_value)]
        key_value: Vec<(String, Value)>,

        /// Projection directive: name, -name, ..., new=old, new=(old), new=expression
        #[arg(long = "proj")]
        proj: Vec<String>,

        /// Print the count query instead
        #[arg(long)]
        count: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// `NAME=VALUE`; VALUE is read as JSON when it parses, otherwise as text.
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in `{}`", s));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}
