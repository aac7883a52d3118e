//! Adapter HTTP surface.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/node_group/{group}` | Rewrite the group's upstream block from `{"nodes": [...]}` |
//! | GET | `/upstream` | Current upstream file contents |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, warn};

use alb_sync::SubmitRequest;

use crate::store::UpstreamStore;

pub fn build_router(store: Arc<UpstreamStore>) -> Router {
    Router::new()
        .route("/node_group/{group}", post(update_group))
        .route("/upstream", get(show_upstream))
        .with_state(store)
}

/// POST /node_group/{group}
async fn update_group(
    State(store): State<Arc<UpstreamStore>>,
    Path(group): Path<String>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()).into_response();
        }
    };

    match store.update_group(&group, &req.nodes).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) if e.is_bad_input() => {
            warn!(%group, error = %e, "rejected upstream update");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
        Err(e) => {
            error!(%group, error = %e, "failed to update upstream");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /upstream
async fn show_upstream(State(store): State<Arc<UpstreamStore>>) -> Response {
    match store.contents().await {
        Ok(contents) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
