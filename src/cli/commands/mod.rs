//! Subcommands module for bmc-actor CLI

pub mod exec;
pub mod serve;

use std::sync::Arc;

use bmc_actor::config::Config;
use bmc_actor::driver::{Connector, NoNativeDriver};

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Native driver used for every target
    pub connector: Arc<dyn Connector>,
}

impl CommandContext {
    /// Create a new command context from loaded configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector: Arc::new(NoNativeDriver),
        }
    }
}
