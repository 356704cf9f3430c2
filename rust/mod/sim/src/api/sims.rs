use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json,
};
use serde::Deserialize;

use salesops_core::ServiceError;

use crate::model::{AssignOutcome, SimCard, SimSummary};
use super::{actor, ok_json, outcome_response, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sims", post(provision_sims))
        .route("/sims/available", get(select_available))
        .route("/sims/{id}", get(get_sim))
        .route("/sims/{id}/assign", post(assign))
        .route("/sims/{id}/reassign", post(reassign))
}

#[derive(Deserialize)]
struct AvailableQuery {
    scope: String,
    include: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionBody {
    scope: String,
    serials: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRef {
    client_id: String,
}

async fn select_available(
    State(svc): State<AppState>,
    Query(q): Query<AvailableQuery>,
) -> Result<Json<Vec<SimSummary>>, ServiceError> {
    ok_json(svc.select_available(&q.scope, q.include.as_deref()))
}

async fn provision_sims(
    State(svc): State<AppState>,
    Json(body): Json<ProvisionBody>,
) -> Result<Json<Vec<SimCard>>, ServiceError> {
    ok_json(svc.provision_sims(&body.scope, body.serials))
}

async fn get_sim(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SimCard>, ServiceError> {
    ok_json(svc.get_sim(&id))
}

async fn assign(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ClientRef>,
) -> (StatusCode, Json<AssignOutcome>) {
    outcome_response(svc.assign(&actor(&headers), &id, &body.client_id).into())
}

async fn reassign(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ClientRef>,
) -> (StatusCode, Json<AssignOutcome>) {
    outcome_response(svc.reassign(&actor(&headers), &id, &body.client_id).into())
}
