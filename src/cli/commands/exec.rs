//! The `exec` subcommand.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::debug;

use super::CommandContext;
use bmc_actor::engine::Engine;
use bmc_actor::executor::{Target, TargetKind};

/// Arguments for exec command
#[derive(Args, Debug, Clone)]
pub struct ExecArgs {
    /// Target to act on
    #[command(subcommand)]
    pub target: ExecTarget,
}

/// Target selection for exec
#[derive(Subcommand, Debug, Clone)]
pub enum ExecTarget {
    /// A standalone server
    Host {
        /// Controller address
        host: String,
        /// Actions to run, e.g. poweroff "sleep 5s" poweron
        #[arg(required = true)]
        actions: Vec<String>,
    },

    /// A blade chassis
    Chassis {
        /// Chassis controller address
        host: String,
        /// Actions to run
        #[arg(required = true)]
        actions: Vec<String>,
    },

    /// A blade addressed by slot
    #[command(name = "blade-pos")]
    BladePos {
        /// Chassis controller address
        host: String,
        /// Slot number
        #[arg(allow_negative_numbers = true)]
        position: String,
        /// Actions to run
        #[arg(required = true)]
        actions: Vec<String>,
    },

    /// A blade addressed by serial number
    #[command(name = "blade-serial")]
    BladeSerial {
        /// Chassis controller address
        host: String,
        /// Blade serial number
        serial: String,
        /// Actions to run
        #[arg(required = true)]
        actions: Vec<String>,
    },
}

impl ExecTarget {
    /// Split into target kind, executor parameters and action tokens.
    pub fn into_parts(self) -> (TargetKind, bmc_actor::executor::Params, Vec<String>) {
        match self {
            ExecTarget::Host { host, actions } => {
                (TargetKind::Host, Target::Host { host }.to_params(), actions)
            }
            ExecTarget::Chassis { host, actions } => {
                (TargetKind::Chassis, Target::Chassis { host }.to_params(), actions)
            }
            ExecTarget::BladePos {
                host,
                position,
                actions,
            } => {
                // The slot stays text so the executor reports a bad value
                // like any other invalid parameter.
                let mut params = Target::Chassis { host }.to_params();
                params.insert(
                    bmc_actor::executor::params::PARAM_BLADE_POS.to_string(),
                    serde_json::Value::from(position),
                );
                (TargetKind::BladeByPosition, params, actions)
            }
            ExecTarget::BladeSerial {
                host,
                serial,
                actions,
            } => (
                TargetKind::BladeBySerial,
                Target::BladeBySerial {
                    chassis: host,
                    serial,
                }
                .to_params(),
                actions,
            ),
        }
    }
}

impl ExecArgs {
    /// Compile and run the plan, print results as JSON and return the exit
    /// code: 0 on success, 2 when an action failed, 4 when the sequence did
    /// not compile.
    pub async fn execute(self, ctx: &CommandContext) -> Result<i32> {
        let engine = Engine::from_config(&ctx.config, ctx.connector.clone())?;
        let (kind, params, actions) = self.target.into_parts();

        let plan = match engine.plan_maker(kind).make_plan(&actions, &params) {
            Ok(plan) => plan,
            Err(err) => {
                eprintln!("Error: {err}");
                return Ok(err.exit_code());
            }
        };
        debug!(target_kind = %kind, actions = ?plan.actions(), "running plan");

        let outcome = plan.run().await;
        println!("{}", serde_json::to_string_pretty(outcome.results())?);

        Ok(outcome.error().map_or(0, |err| err.exit_code()))
    }
}
