//! The storage endpoint: `POST {prefix}/:action`.
//!
//! The request body is passed to [`StorageRouter`](crate::router::StorageRouter)
//! untouched. Success answers 200 with the JSON result; a `read` of an
//! absent id answers 200 with an empty body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use stowage_core::StorageAction;

use crate::error::ApiResult;
use crate::state::AppState;

/// POST {prefix}/:action
pub async fn dispatch(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: String,
) -> ApiResult<Response> {
    let value = state
        .router
        .request(&action, &body, state.storage.as_ref())
        .await?;

    if value.is_null() && action == StorageAction::Read.as_str() {
        return Ok(StatusCode::OK.into_response());
    }
    Ok(Json(value).into_response())
}

/// Create the storage router mounted under `prefix` ("" for the root).
pub fn create_router(prefix: &str) -> Router<AppState> {
    Router::new().route(&format!("{}/:action", prefix), post(dispatch))
}
