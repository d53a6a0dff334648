//! bmc-actor - power, boot and console control through management controllers
//!
//! This is the main entry point for the bmc-actor CLI.

mod cli;

use anyhow::Result;
use bmc_actor::config::Config;
use bmc_actor::logging::{level_from_verbosity, LoggingBuilder};
use cli::commands::CommandContext;
use cli::{Cli, Commands};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref())?;

    // Initialize logging based on configuration and verbosity
    init_logging(&cli, &config);

    if cli.verbosity() >= 2 {
        eprintln!("bmc-actor v{}", VERSION);
    }

    let ctx = CommandContext::new(config);

    // Execute the appropriate command
    let exit_code = match cli.command {
        Commands::Serve(args) => args.execute(&ctx).await?,
        Commands::Exec(args) => args.execute(&ctx).await?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging. `-v` flags override the configured level.
fn init_logging(cli: &Cli, config: &Config) {
    let mut builder = LoggingBuilder::from_config(&config.logging).with_target(cli.verbosity() >= 3);
    if cli.verbosity() > 0 {
        builder = builder.with_level(level_from_verbosity(cli.verbosity()));
    }
    if let Err(e) = builder.init() {
        eprintln!("Warning: {}", e);
    }
}
