//! Route registration — collects all module routes + system endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

/// Build the complete router. Module routers carry their own prefix and
/// state, so they are merged as they are.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        tracing::debug!(module = name, "mounting module routes");
        app = app.merge(router);
    }
    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "salesopsd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use salesops_core::Module;
    use salesops_sql::SqliteStore;
    use sim::model::ProductCatalog;
    use sim::service::SimService;
    use sim::SimModule;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let module = SimModule::new(SimService::new(sql, ProductCatalog::default()).unwrap());
        build_router(vec![(module.name(), module.routes())])
    }

    #[tokio::test]
    async fn health_and_module_routes_are_mounted() {
        let app = app();

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let req = Request::builder()
            .uri("/sim/v1/sims/available?scope=V001")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        assert_eq!(bytes.as_ref(), b"[]");
    }
}
