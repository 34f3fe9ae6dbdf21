//! CLI module for relalg
//!
//! Provides command-line interface for:
//! - tables: List resolved tables
//! - describe: Print a table heading with lineage
//! - sql: Build an expression and print its SQL

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_expression, describe, run, run_command, tables};
pub use errors::{CliError, CliErrorCode, CliResult};
