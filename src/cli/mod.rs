//! Command-line interface definitions for the `caravan` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `caravan` binary.
#[derive(Debug, Parser)]
#[command(
    name = "caravan",
    about = "Provision multi-region buckets and tables for migration demos",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create the source and target resources for a fresh run.
    #[command(
        name = "provision",
        about = "Create the source and target resources for a fresh run"
    )]
    Provision(ProvisionCommand),
    /// Write local sample data fixtures.
    #[command(name = "seed", about = "Write local sample data fixtures")]
    Seed(SeedCommand),
    /// Load the sample users into the source table.
    #[command(name = "populate", about = "Load the sample users into the source table")]
    Populate(PopulateCommand),
    /// Remove every resource a previous run recorded.
    #[command(name = "cleanup", about = "Remove every resource a previous run recorded")]
    Cleanup(CleanupCommand),
}

/// Arguments for the `caravan provision` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ProvisionCommand {
    /// Override the registry file path for this run.
    #[arg(long, value_name = "PATH")]
    pub(crate) registry: Option<String>,
}

/// Arguments for the `caravan seed` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SeedCommand {
    /// Override the fixture output directory.
    #[arg(long, value_name = "DIR")]
    pub(crate) out: Option<String>,
}

/// Arguments for the `caravan populate` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct PopulateCommand {
    /// Registry file naming the source table to load.
    #[arg(long, value_name = "PATH")]
    pub(crate) registry: Option<String>,
}

/// Arguments for the `caravan cleanup` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CleanupCommand {
    /// Registry file naming the resources to remove.
    #[arg(long, value_name = "PATH")]
    pub(crate) registry: Option<String>,
}
