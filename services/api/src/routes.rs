use crate::infra::AppState;
use academy::classroom::{classroom_router, ClassroomService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_classroom_routes(service: Arc<ClassroomService>) -> axum::Router {
    classroom_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy::classroom::{ClassroomDeps, StudentDirectory};
    use academy::config::ClassroomConfig;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn service() -> Arc<ClassroomService> {
        let directory = StudentDirectory::new().with_student("cohort-a", "amara", "Amara Okafor");
        Arc::new(ClassroomService::new(
            ClassroomDeps::in_memory(Arc::new(directory)),
            ClassroomConfig::default(),
        ))
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let state = state(false);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn service_routes_and_classroom_routes_share_a_router() {
        let app = with_classroom_routes(service()).layer(Extension(state(true)));

        let health = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responded");
        assert_eq!(health.status(), StatusCode::OK);

        let missing = app
            .oneshot(
                Request::get("/api/v1/classes/cls-unknown")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responded");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
