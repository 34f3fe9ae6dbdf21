//! CLI command implementations
//!
//! Every command loads the engine config and the catalog first, then works
//! on expressions built from it. Results are written to `out`.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::expression::{Projection, QueryExpression, TableRef};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_block, write_lines};

/// Parse arguments from the process and run the selected command
pub fn run() -> CliResult<()> {
    init_logging();
    let cli = Cli::parse_args();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(cli, &mut out)
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run a parsed command line
pub fn run_command(cli: Cli, out: &mut impl Write) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;
    let catalog = Catalog::load_dir(&cli.catalog)?;
    debug!(catalog = %cli.catalog.display(), "catalog loaded");

    match cli.command {
        Command::Tables => tables(&catalog, out),
        Command::Describe { table } => describe(&catalog, &table, out),
        Command::Sql {
            table,
            join,
            restrict,
            key_value,
            proj,
            count,
        } => {
            let expression =
                build_expression(&catalog, &config, &table, &join, &restrict, key_value, &proj)?;
            let sql = if count {
                expression.count_sql_with(&config)
            } else {
                expression.to_sql_with(&config)
            };
            write_block(out, &sql)
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// One line per table: name and primary key
pub fn tables(catalog: &Catalog, out: &mut impl Write) -> CliResult<()> {
    let lines = catalog.tables().filter_map(|table| {
        catalog
            .heading(table)
            .map(|heading| format!("{}  ({})", table, heading.primary_key().join(", ")))
    });
    write_lines(out, lines)
}

/// Heading of one table, with its comment when present
pub fn describe(catalog: &Catalog, table: &str, out: &mut impl Write) -> CliResult<()> {
    let table_ref: TableRef = table.parse()?;
    let heading = catalog
        .heading(&table_ref)
        .ok_or_else(|| CliError::invalid_argument(format!("unknown table `{}`", table)))?;

    let mut text = format!("# {}\n", table_ref);
    if let Some(definition) = catalog.definition(&table_ref) {
        if !definition.comment.is_empty() {
            text.push_str(&format!("# {}\n", definition.comment));
        }
    }
    text.push_str(&heading.describe());
    write_block(out, &text)
}

/// Joins first, in order; then restrictions; the projection last. Joins use
/// the configured namesake lineage check.
pub fn build_expression(
    catalog: &Catalog,
    config: &EngineConfig,
    table: &str,
    joins: &[String],
    restrictions: &[String],
    key_values: Vec<(String, Value)>,
    directives: &[String],
) -> CliResult<QueryExpression> {
    let mut expression = catalog.expression(table)?;
    for other in joins {
        expression = expression.join_in(&catalog.expression(other)?, config)?;
    }
    for predicate in restrictions {
        expression = expression.restrict_in(predicate.as_str(), config)?;
    }
    if !key_values.is_empty() {
        let mapping: BTreeMap<String, Value> = key_values.into_iter().collect();
        expression = expression.restrict_in(mapping, config)?;
    }
    if !directives.is_empty() {
        expression = expression.proj(&parse_projection(directives)?)?;
    }
    Ok(expression)
}

/// `name`, `-name` and `...` are plain directives; `new=definition` is named.
fn parse_projection(directives: &[String]) -> CliResult<Projection> {
    let mut names = Vec::new();
    let mut named = Vec::new();
    for directive in directives {
        let directive = directive.trim();
        if directive.is_empty() {
            return Err(CliError::invalid_argument("empty projection directive"));
        }
        match directive.split_once('=') {
            Some((new, definition)) if !directive.starts_with('-') => {
                named.push((new.trim(), definition.trim()))
            }
            _ => names.push(directive),
        }
    }
    Ok(Projection::parse(&names, &named)?)
}
