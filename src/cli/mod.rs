//! CLI module for bmc-actor
//!
//! Argument parsing and subcommand dispatch for the `bmc-actor` binary.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bmc-actor - power, boot and console control through management controllers
#[derive(Parser, Debug, Clone)]
#[command(name = "bmc-actor")]
#[command(author = "bmc-actor Contributors")]
#[command(version)]
#[command(about = "Power, boot and console control through management controllers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "BMC_ACTOR_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the HTTP API
    Serve(commands::serve::ServeArgs),

    /// Run an action sequence against one target and print the results
    Exec(commands::exec::ExecArgs),
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}
