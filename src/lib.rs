//! # bmc-actor
//!
//! Remote power, boot and diagnostic control of physical servers, blade
//! chassis and individual blades through their management controllers.
//!
//! Clients describe what to do as an ordered list of action tokens such as
//! `["poweroff", "sleep 5s", "poweron"]`. A [`PlanMaker`](executor::PlanMaker)
//! compiles the list against one target, rejecting anything the target cannot
//! do before any hardware is touched. The resulting
//! [`ExecutionPlan`](executor::ExecutionPlan) runs the actions in order, stops
//! at the first failure and always releases the controller session.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bmc_actor::prelude::*;
//!
//! # async fn run() -> bmc_actor::Result<()> {
//! let engine = Engine::builder(Credentials::new("admin", "secret"), Arc::new(NoNativeDriver))
//!     .build();
//! let target = Target::Host { host: "10.0.0.7".into() };
//!
//! let plan = engine
//!     .plan_maker(TargetKind::Host)
//!     .make_plan(&["ison", "sleep 1s", "powercycle"], &target.to_params())?;
//! let outcome = plan.run().await;
//! for result in outcome.results() {
//!     println!("{} -> {} ({})", result.action, result.status, result.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`actions`]: the token vocabulary and the sleep grammar
//! - [`driver`]: the traits native drivers implement
//! - [`connection`]: lazy, once-only sessions, IPMI fallback, blade slot cache
//! - [`executor`]: per-target executors, plan compilation and execution
//! - [`screenshot`]: local and S3 screenshot storage
//! - [`api`]: the HTTP surface (feature `api`)

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod config;
pub mod connection;
pub mod driver;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod screenshot;

#[cfg(feature = "api")]
pub mod api;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::actions::{classify, Action, Classification};
    pub use crate::config::Config;
    pub use crate::connection::{BackendKind, ChassisConnection, HostConnection};
    pub use crate::driver::{
        BladeDriver, ChassisDriver, ChassisManagement, Connector, Credentials, DriverError,
        DriverResult, Endpoint, HostDriver, HostFallback, NoNativeDriver,
    };
    pub use crate::engine::Engine;
    pub use crate::error::{Error, Result};
    pub use crate::executor::{
        ActionResult, ExecutionPlan, Executor, ExecutorFactory, Params, PlanMaker, PlanOutcome,
        Target, TargetKind,
    };
    pub use crate::screenshot::{LocalStore, ScreenshotStore};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
