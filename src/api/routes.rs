//! API route configuration.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;

use super::handlers;
use super::state::AppState;

/// Create the main API router with all routes.
pub fn api_routes(state: Arc<AppState>) -> Router {
    let screenshots = ServeDir::new(&state.screenshot_dir);
    let prefix = normalize_prefix(&state.screenshot_prefix);

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(host_routes())
        .merge(chassis_routes());
    let router = if prefix == "/" {
        router.fallback_service(screenshots)
    } else {
        router.nest_service(&prefix, screenshots)
    };
    router.with_state(state)
}

fn host_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/host/:host",
        get(handlers::host_power_status).post(handlers::host_execute_actions),
    )
}

fn chassis_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/chassis/:host",
            get(handlers::chassis_power_status).post(handlers::chassis_execute_actions),
        )
        .route(
            "/chassis/:host/position/:pos",
            get(handlers::blade_by_pos_power_status).post(handlers::blade_by_pos_execute_actions),
        )
        .route(
            "/chassis/:host/serial/:serial",
            get(handlers::blade_by_serial_power_status)
                .post(handlers::blade_by_serial_execute_actions),
        )
}

/// `screenshot/` and `/screenshot` both become `/screenshot`.
fn normalize_prefix(prefix: &str) -> String {
    format!("/{}", prefix.trim_matches('/'))
}
