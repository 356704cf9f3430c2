pub mod clients;
pub mod sims;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json,
};
use serde::Serialize;

use salesops_core::ServiceError;

use crate::model::AssignOutcome;
use crate::service::consistency::ConsistencyFault;
use crate::service::SimService;

/// Shared application state.
pub type AppState = Arc<SimService>;

/// Header naming the operator on whose behalf a request runs.
pub const ACTOR_HEADER: &str = "x-actor";
const ANONYMOUS: &str = "anonymous";

/// Build the SIM API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/sim/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(sims::routes())
        .merge(clients::routes())
        .route("/consistency", get(check_consistency))
}

/// Wrap a Result<T, ServiceError> into an API response.
pub(crate) fn ok_json<T: Serialize>(result: Result<T, ServiceError>) -> Result<Json<T>, ServiceError> {
    result.map(Json)
}

/// Engine results always carry a JSON body; the status follows the failure class.
pub(crate) fn outcome_response(outcome: AssignOutcome) -> (StatusCode, Json<AssignOutcome>) {
    let status = match outcome.code {
        None => StatusCode::OK,
        Some("NOT_FOUND") => StatusCode::NOT_FOUND,
        Some("INVALID_STATE") => StatusCode::CONFLICT,
        Some("SCOPE_MISMATCH") => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(outcome))
}

pub(crate) fn actor(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

async fn check_consistency(
    State(svc): State<AppState>,
) -> Result<Json<Vec<ConsistencyFault>>, ServiceError> {
    ok_json(svc.check_consistency())
}
