use super::*;
use axum::{body, body::Body, http::Request};
use shared::domain::{MediaKind, TitleCode};
use storage::{NewPart, NewTitle};
use tower::ServiceExt;

async fn storage() -> Storage {
    Storage::new("sqlite::memory:")
        .await
        .expect("in-memory storage")
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = build_router(storage().await);

    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn healthz_reports_unavailable_storage() {
    let storage = storage().await;
    storage.close().await;
    let app = build_router(storage);

    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let error: ApiError = serde_json::from_slice(&body).expect("error json");
    assert_eq!(error.code, ErrorCode::Internal);
}

#[tokio::test]
async fn stats_returns_catalog_counts() {
    let storage = storage().await;
    storage
        .create_title(&NewTitle {
            code: TitleCode(42),
            description: "Blue Harbor".into(),
            cover_file_id: None,
            parts: vec![
                NewPart {
                    number: 1,
                    file_id: "v1".into(),
                    kind: MediaKind::Video,
                },
                NewPart {
                    number: 2,
                    file_id: "v2".into(),
                    kind: MediaKind::Video,
                },
            ],
            group_ids: Vec::new(),
        })
        .await
        .expect("create title");
    let app = build_router(storage);

    let request = Request::get("/stats").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let stats: CatalogStats = serde_json::from_slice(&body).expect("stats json");
    assert_eq!(stats.titles, 1);
    assert_eq!(stats.parts, 2);
    assert_eq!(stats.users, 0);
}
