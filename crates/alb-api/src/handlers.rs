//! REST API handlers.
//!
//! Reads return the registry views as-is. Mutations return
//! `{"success": true}` with 201 for creates and 200 otherwise.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use alb_registry::*;

use crate::ApiState;
use crate::error::{ApiError, ApiResponse};

type ApiResult<T> = Result<T, ApiError>;

// ── Node groups ────────────────────────────────────────────────

/// GET /node_group
pub async fn list_groups(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.plane.node_groups())
}

/// GET /node_group/{group}
pub async fn get_group(
    State(state): State<ApiState>,
    Path(group): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.plane.node_group(&group)?))
}

/// POST /node_group/{group}
pub async fn create_group(
    State(state): State<ApiState>,
    Path(group): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.plane.create_node_group(&group).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok()))
}

/// DELETE /node_group/{group}
pub async fn delete_group(
    State(state): State<ApiState>,
    Path(group): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.plane.remove_node_group(&group).await?;
    Ok(ApiResponse::ok())
}

// ── Nodes ──────────────────────────────────────────────────────

/// GET /node_group/{group}/node
pub async fn list_nodes(
    State(state): State<ApiState>,
    Path(group): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.plane.nodes(&group)?))
}

/// GET /node_group/{group}/node/{node}
pub async fn get_node(
    State(state): State<ApiState>,
    Path((group, node)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.plane.node(&group, &node)?))
}

/// POST /node_group/{group}/node/{node}
pub async fn create_node(
    State(state): State<ApiState>,
    Path((group, node)): Path<(String, String)>,
    body: Result<Json<NewNode>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    state.plane.create_node(&group, &node, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok()))
}

/// PUT /node_group/{group}/node/{node}
pub async fn update_node(
    State(state): State<ApiState>,
    Path((group, node)): Path<(String, String)>,
    body: Result<Json<NodeUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = body?;
    state.plane.update_node(&group, &node, update).await?;
    Ok(ApiResponse::ok())
}

/// DELETE /node_group/{group}/node/{node}
pub async fn delete_node(
    State(state): State<ApiState>,
    Path((group, node)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    state.plane.remove_node(&group, &node).await?;
    Ok(ApiResponse::ok())
}

// ── Attributes ─────────────────────────────────────────────────

/// GET /node_group/{group}/node/{node}/attribute
pub async fn list_attributes(
    State(state): State<ApiState>,
    Path((group, node)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.plane.node_attributes(&group, &node)?))
}

/// GET /node_group/{group}/node/{node}/attribute/{attribute}
pub async fn get_attribute(
    State(state): State<ApiState>,
    Path((group, node, attribute)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.plane.node_attribute(&group, &node, &attribute)?))
}

/// POST /node_group/{group}/node/{node}/attribute/{attribute}
pub async fn create_attribute(
    State(state): State<ApiState>,
    Path((group, node, attribute)): Path<(String, String, String)>,
    body: Result<Json<NewAttribute>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    state
        .plane
        .create_node_attribute(&group, &node, &attribute, req)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok()))
}

/// PUT /node_group/{group}/node/{node}/attribute/{attribute}
pub async fn update_attribute(
    State(state): State<ApiState>,
    Path((group, node, attribute)): Path<(String, String, String)>,
    body: Result<Json<AttributeUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = body?;
    state
        .plane
        .update_node_attribute(&group, &node, &attribute, update)
        .await?;
    Ok(ApiResponse::ok())
}

/// DELETE /node_group/{group}/node/{node}/attribute/{attribute}
pub async fn delete_attribute(
    State(state): State<ApiState>,
    Path((group, node, attribute)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    state
        .plane
        .remove_node_attribute(&group, &node, &attribute)
        .await?;
    Ok(ApiResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use alb_control::ControlPlane;
    use alb_sync::RecordingSyncClient;

    fn test_state() -> (ApiState, Arc<RecordingSyncClient>) {
        let sync = Arc::new(RecordingSyncClient::new());
        let plane = Arc::new(ControlPlane::new(sync.clone()));
        (ApiState { plane }, sync)
    }

    fn group_path(group: &str) -> Path<String> {
        Path(group.to_string())
    }

    fn node_path(group: &str, node: &str) -> Path<(String, String)> {
        Path((group.to_string(), node.to_string()))
    }

    #[tokio::test]
    async fn list_groups_empty() {
        let (state, _) = test_state();
        let resp = list_groups(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_and_get_group() {
        let (state, _) = test_state();
        let resp = create_group(State(state.clone()), group_path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = get_group(State(state), group_path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_group_conflicts() {
        let (state, _) = test_state();
        let resp = create_group(State(state.clone()), group_path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = create_group(State(state), group_path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn get_nonexistent_node() {
        let (state, _) = test_state();
        state.plane.create_node_group("web").await.unwrap();
        let resp = get_node(State(state), node_path("web", "nope"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_node_pushes_to_proxy() {
        let (state, sync) = test_state();
        state.plane.create_node_group("web").await.unwrap();

        let req = NewNode {
            host: "10.0.0.1".to_string(),
            port: 80,
        };
        let resp = create_node(State(state), node_path("web", "a"), Ok(Json(req)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(sync.last_push("web").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn propagation_failure_is_server_error() {
        let (state, sync) = test_state();
        state.plane.create_node_group("web").await.unwrap();
        sync.set_failing(true);

        let req = NewNode {
            host: "10.0.0.1".to_string(),
            port: 80,
        };
        let resp = create_node(State(state.clone()), node_path("web", "a"), Ok(Json(req)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The node was still created.
        let resp = get_node(State(state), node_path("web", "a"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_group_missing() {
        let (state, sync) = test_state();
        let resp = delete_group(State(state), group_path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(sync.pushes().is_empty());
    }

    #[tokio::test]
    async fn unusable_group_name_is_unprocessable() {
        let (state, _) = test_state();
        let resp = create_group(State(state.clone()), group_path("my group"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.plane.node_groups().is_empty());
    }

    #[tokio::test]
    async fn non_finite_weight_is_unprocessable_and_not_pushed() {
        let (state, sync) = test_state();
        state.plane.create_node_group("web").await.unwrap();
        let req = NewNode {
            host: "10.0.0.1".to_string(),
            port: 80,
        };
        let resp = create_node(State(state.clone()), node_path("web", "a"), Ok(Json(req)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let pushes = sync.pushes().len();

        let req = NewAttribute {
            value: 1e308,
            weight: 10.0,
        };
        let resp = create_attribute(
            State(state.clone()),
            Path(("web".to_string(), "a".to_string(), "cpu".to_string())),
            Ok(Json(req)),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(sync.pushes().len(), pushes);
        assert_eq!(state.plane.node("web", "a").unwrap().weight, 0.0);
    }
}
