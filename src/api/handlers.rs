//! API request handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::{error, warn};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::{ActionRequest, ActionResponse, HealthResponse};
use crate::actions::Action;
use crate::executor::params::{PARAM_BLADE_POS, PARAM_BLADE_SERIAL, PARAM_HOST};
use crate::executor::{Params, TargetKind};

// ============================================================================
// Path validation
// ============================================================================

/// A controller address must be non-empty.
pub fn validate_host(host: &str) -> ApiResult<()> {
    if host.is_empty() {
        return Err(ApiError::BadRequest(format!("invalid host: {host:?}")));
    }
    Ok(())
}

/// A slot must parse as an integer; negative values pass.
pub fn validate_blade_pos(pos: &str) -> ApiResult<()> {
    pos.parse::<i32>()
        .map(|_| ())
        .map_err(|e| ApiError::BadRequest(format!("invalid pos: {pos:?}: {e}")))
}

/// A serial must be non-empty.
pub fn validate_blade_serial(serial: &str) -> ApiResult<()> {
    if serial.is_empty() {
        return Err(ApiError::BadRequest(format!("invalid serial: {serial:?}")));
    }
    Ok(())
}

fn params(entries: &[(&str, &str)]) -> Params {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

// ============================================================================
// Shared plan handling
// ============================================================================

/// Run `["ison"]` and return the single result.
async fn power_status(
    state: &AppState,
    kind: TargetKind,
    params: Params,
) -> ApiResult<Json<ActionResponse>> {
    let plan = state
        .engine
        .plan_maker(kind)
        .make_plan(&[Action::IsOn.as_str()], &params)?;
    let outcome = plan.run().await;

    let Some(result) = outcome.results().first() else {
        let message = "actions have been executed but no response returned";
        error!(target_kind = %kind, "{message}");
        return Err(ApiError::Internal(message.to_string()));
    };
    let response = ActionResponse::from(result);
    if outcome.is_success() {
        Ok(Json(response))
    } else {
        Err(ApiError::QueryFailed(response))
    }
}

/// Run the requested sequence and return every result.
async fn execute_actions(
    state: &AppState,
    kind: TargetKind,
    params: Params,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    let Json(request) = body.map_err(|e| {
        warn!(target_kind = %kind, error = %e, "failed to unmarshal request");
        ApiError::BadRequest(format!("failed to unmarshal request: {e}"))
    })?;

    let plan = state
        .engine
        .plan_maker(kind)
        .make_plan(&request.action_sequence, &params)?;
    let outcome = plan.run().await;

    let responses: Vec<ActionResponse> = outcome.results().iter().map(Into::into).collect();
    if outcome.is_success() {
        Ok(Json(responses))
    } else {
        Err(ApiError::ActionFailed(responses))
    }
}

// ============================================================================
// Host
// ============================================================================

/// GET /host/:host
pub async fn host_power_status(
    State(state): State<Arc<AppState>>,
    Path(host): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    validate_host(&host)?;
    power_status(&state, TargetKind::Host, params(&[(PARAM_HOST, host.as_str())])).await
}

/// POST /host/:host
pub async fn host_execute_actions(
    State(state): State<Arc<AppState>>,
    Path(host): Path<String>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    validate_host(&host)?;
    execute_actions(&state, TargetKind::Host, params(&[(PARAM_HOST, host.as_str())]), body).await
}

// ============================================================================
// Chassis
// ============================================================================

/// GET /chassis/:host
pub async fn chassis_power_status(
    State(state): State<Arc<AppState>>,
    Path(host): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    validate_host(&host)?;
    power_status(&state, TargetKind::Chassis, params(&[(PARAM_HOST, host.as_str())])).await
}

/// POST /chassis/:host
pub async fn chassis_execute_actions(
    State(state): State<Arc<AppState>>,
    Path(host): Path<String>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    validate_host(&host)?;
    execute_actions(&state, TargetKind::Chassis, params(&[(PARAM_HOST, host.as_str())]), body).await
}

// ============================================================================
// Blades
// ============================================================================

/// GET /chassis/:host/position/:pos
pub async fn blade_by_pos_power_status(
    State(state): State<Arc<AppState>>,
    Path((host, pos)): Path<(String, String)>,
) -> ApiResult<Json<ActionResponse>> {
    validate_host(&host)?;
    validate_blade_pos(&pos)?;
    let params = params(&[(PARAM_HOST, host.as_str()), (PARAM_BLADE_POS, pos.as_str())]);
    power_status(&state, TargetKind::BladeByPosition, params).await
}

/// POST /chassis/:host/position/:pos
pub async fn blade_by_pos_execute_actions(
    State(state): State<Arc<AppState>>,
    Path((host, pos)): Path<(String, String)>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    validate_host(&host)?;
    validate_blade_pos(&pos)?;
    let params = params(&[(PARAM_HOST, host.as_str()), (PARAM_BLADE_POS, pos.as_str())]);
    execute_actions(&state, TargetKind::BladeByPosition, params, body).await
}

/// GET /chassis/:host/serial/:serial
pub async fn blade_by_serial_power_status(
    State(state): State<Arc<AppState>>,
    Path((host, serial)): Path<(String, String)>,
) -> ApiResult<Json<ActionResponse>> {
    validate_host(&host)?;
    validate_blade_serial(&serial)?;
    let params = params(&[(PARAM_HOST, host.as_str()), (PARAM_BLADE_SERIAL, serial.as_str())]);
    power_status(&state, TargetKind::BladeBySerial, params).await
}

/// POST /chassis/:host/serial/:serial
pub async fn blade_by_serial_execute_actions(
    State(state): State<Arc<AppState>>,
    Path((host, serial)): Path<(String, String)>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    validate_host(&host)?;
    validate_blade_serial(&serial)?;
    let params = params(&[(PARAM_HOST, host.as_str()), (PARAM_BLADE_SERIAL, serial.as_str())]);
    execute_actions(&state, TargetKind::BladeBySerial, params, body).await
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    })
}
