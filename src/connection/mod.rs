//! Connection layer for bmc-actor.
//!
//! Wraps driver sessions so executors can call operations without caring
//! whether the session is open yet:
//!
//! - [`HostConnection`]: a server controller, with IPMI fallback
//! - [`ChassisConnection`]: a chassis controller and the blades behind it
//! - [`BladePositionCache`]: serial-to-slot cache owned by a chassis connection
//! - [`IpmiTool`]: the `ipmitool` based fallback driver
//!
//! Sessions open on first use, at most once, and are released by `close`.

pub mod cache;
pub mod chassis;
pub mod host;
pub mod ipmi;
pub mod lazy;

pub use cache::BladePositionCache;
pub use chassis::ChassisConnection;
pub use host::{BackendKind, HostBackend, HostConnection};
pub use ipmi::{IpmiFallback, IpmiTool};
pub use lazy::LazyConnection;
