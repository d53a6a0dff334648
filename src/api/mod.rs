//! HTTP API for bmc-actor.
//!
//! Exposes action plans for servers, chassis and blades:
//!
//! - `GET` on a target reports its power state (`["ison"]`)
//! - `POST` on a target runs `{"action-sequence": [...]}` and returns every
//!   result; `400` for an invalid request or sequence, `417` with the partial
//!   results when an action fails
//! - stored screenshots are served under the configured prefix
//!
//! # Example
//!
//! ```rust,ignore
//! use bmc_actor::api::{ApiServer, AppState};
//!
//! let server = ApiServer::new("0.0.0.0:8000".parse()?, state);
//! server.run().await?;
//! ```

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use types::*;

/// The HTTP server.
pub struct ApiServer {
    bind_address: SocketAddr,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a server.
    pub fn new(bind_address: SocketAddr, state: AppState) -> Self {
        Self {
            bind_address,
            state: Arc::new(state),
        }
    }

    /// Build the router with request tracing.
    pub fn router(&self) -> Router {
        routes::api_routes(Arc::clone(&self.state)).layer(TraceLayer::new_for_http())
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> Result<(), std::io::Error> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` completes.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = self.bind_address;
        let router = self.router();

        info!("Starting bmc-actor API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
