//! Smoke tests for the HTTP surface (C13) wired end-to-end through axum's
//! `Router::oneshot`, without binding a real socket.

use archivum_core::dto::SourceDto;
use archivum_core::model::{PhysicalId, SourceStatus, SourceType};
use archivum_server::api::{self, AppState};
use archivum_server::ingest::SourceLocks;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    archivum_server::store::run_migrations(&pool).await.expect("run migrations");
    let state = AppState {
        pool,
        locks: SourceLocks::new(),
    };
    api::router(state)
}

fn sample_source() -> SourceDto {
    let now = Utc::now();
    SourceDto {
        id: Uuid::new_v4(),
        name: "usb-drive-1".to_string(),
        source_type: SourceType::Disk,
        root_path: "/mnt/usb1".to_string(),
        parent_source_id: None,
        status: SourceStatus::Scanning,
        total_files: 0,
        total_size: 0,
        processed_files: 0,
        processed_size: 0,
        created_at: now,
        updated_at: now,
        physical_id: PhysicalId::default(),
    }
}

#[tokio::test]
async fn create_then_list_sources() {
    let app = test_app().await;
    let payload = sample_source();

    let create_req = Request::builder()
        .method("POST")
        .uri("/api/sources")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(create_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let list_req = Request::builder().uri("/api/sources").body(Body::empty()).unwrap();
    let response = app.oneshot(list_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sources: Vec<SourceDto> = serde_json::from_slice(&body).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, payload.id);
}

#[tokio::test]
async fn duplicate_create_source_request_is_idempotent() {
    let app = test_app().await;
    let payload = sample_source();
    let body_bytes = serde_json::to_vec(&payload).unwrap();

    for _ in 0..2 {
        let req = Request::builder()
            .method("POST")
            .uri("/api/sources")
            .header("content-type", "application/json")
            .body(Body::from(body_bytes.clone()))
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let list_req = Request::builder().uri("/api/sources").body(Body::empty()).unwrap();
    let response = app.oneshot(list_req).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sources: Vec<SourceDto> = serde_json::from_slice(&body).unwrap();
    assert_eq!(sources.len(), 1);
}

#[tokio::test]
async fn unknown_source_returns_404() {
    let app = test_app().await;
    let req = Request::builder()
        .uri(format!("/api/sources/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
