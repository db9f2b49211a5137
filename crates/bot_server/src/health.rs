use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use shared::{
    domain::CatalogStats,
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tracing::warn;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn build_router(storage: Storage) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .with_state(storage)
}

async fn healthz(State(storage): State<Storage>) -> ApiResult<&'static str> {
    storage.health_check().await.map_err(|error| {
        warn!(%error, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, "storage unavailable")),
        )
    })?;
    Ok("ok")
}

async fn stats(State(storage): State<Storage>) -> ApiResult<Json<CatalogStats>> {
    let stats = storage.stats().await.map_err(|error| {
        warn!(%error, "stats query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(error.code(), error.to_string())),
        )
    })?;
    Ok(Json(stats))
}

#[cfg(test)]
#[path = "tests/health_tests.rs"]
mod tests;
