use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json,
};
use serde::Deserialize;

use salesops_core::{ListParams, ListResult, ServiceError};

use crate::model::{ActivityEntry, AssignOutcome, Client, NewClient, SimSummary};
use crate::service::client::ClientSaved;
use super::{actor, ok_json, outcome_response, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", post(create_client))
        .route("/clients/{id}", get(get_client).delete(delete_client))
        .route("/clients/{id}/product", put(update_product))
        .route("/clients/{id}/sim", put(change_sim))
        .route("/clients/{id}/sim-options", get(sim_options))
        .route("/clients/{id}/release", post(release))
        .route("/clients/{id}/activity", get(list_activity))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody {
    product_class: String,
}

#[derive(Deserialize)]
struct SerialBody {
    serial: String,
}

async fn create_client(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewClient>,
) -> Result<Json<ClientSaved>, ServiceError> {
    ok_json(svc.create_client(&actor(&headers), body))
}

async fn get_client(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ServiceError> {
    ok_json(svc.get_client(&id))
}

async fn delete_client(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let released = svc.delete_client(&actor(&headers), &id)?;
    Ok(Json(serde_json::json!({"ok": true, "released": released})))
}

async fn update_product(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Result<Json<ClientSaved>, ServiceError> {
    ok_json(svc.update_client_product(&actor(&headers), &id, &body.product_class))
}

async fn change_sim(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SerialBody>,
) -> (StatusCode, Json<AssignOutcome>) {
    outcome_response(svc.change_client_sim(&actor(&headers), &id, &body.serial).into())
}

async fn sim_options(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SimSummary>>, ServiceError> {
    ok_json(svc.select_for_client(&id))
}

async fn release(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<AssignOutcome>) {
    outcome_response(svc.release(&actor(&headers), &id).into())
}

async fn list_activity(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<ActivityEntry>>, ServiceError> {
    ok_json(svc.list_activity(&id, &params))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use std::sync::Arc;

    use crate::api::{router, ACTOR_HEADER};
    use crate::service::testutil::*;

    async fn send(app: &axum::Router, req: Request<Body>) -> (u16, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header(ACTOR_HEADER, "dana")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn product_change_and_delete_flow() {
        let svc = Arc::new(service());
        sims(&svc, "V001", &["0001", "0002"]);
        let c = client(&svc, "Acme", "V001");
        let app = router(svc.clone());

        let (s, saved) = send(&app, json_req("PUT", &format!("/sim/v1/clients/{}/product", c.id), json!({"productClass": MOBILE}))).await;
        assert_eq!(s, 200);
        assert_eq!(saved["sync"]["action"], "ACQUIRE");
        assert_eq!(saved["sync"]["outcome"]["success"], true);
        assert_eq!(saved["client"]["heldSimSerial"], "0001");

        let (s, out) = send(&app, json_req("PUT", &format!("/sim/v1/clients/{}/sim", c.id), json!({"serial": "0002"}))).await;
        assert_eq!(s, 200);
        assert_eq!(out["binding"]["serial"], "0002");

        let (s, out) = send(&app, json_req("PUT", &format!("/sim/v1/clients/{}/sim", c.id), json!({"serial": "9999"}))).await;
        assert_eq!(s, 404);
        assert_eq!(out["success"], false);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/sim/v1/clients/{}", c.id))
            .body(Body::empty())
            .unwrap();
        let (s, body) = send(&app, req).await;
        assert_eq!(s, 200);
        assert_eq!(body["released"]["serial"], "0002");

        let (_, client) = send(&app, Request::builder().uri(format!("/sim/v1/clients/{}", c.id)).body(Body::empty()).unwrap()).await;
        assert!(client["deletedAt"].is_string());
        assert!(client.get("heldSimSerial").is_none());
        assert_consistent(&svc);
    }

    #[tokio::test]
    async fn release_of_idle_client_is_ok() {
        let svc = Arc::new(service());
        let c = client(&svc, "Idle", "V001");
        let app = router(svc);

        let (s, out) = send(&app, json_req("POST", &format!("/sim/v1/clients/{}/release", c.id), json!({}))).await;
        assert_eq!(s, 200);
        assert_eq!(out["success"], true);
        assert_eq!(out["message"], "client holds no SIM");
    }
}
