//! alb-api — REST API for the ALB registry.
//!
//! Thin axum transport over [`ControlPlane`]. The route table below is the
//! whole surface; handlers only extract, call the facade, and map errors.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/node_group` | List all groups with nested nodes and attributes |
//! | GET/POST/DELETE | `/node_group/{group}` | Read / create / remove a group |
//! | GET | `/node_group/{group}/node` | List nodes of a group |
//! | GET/POST/PUT/DELETE | `/node_group/{group}/node/{node}` | Read / create / update / remove a node |
//! | GET | `/node_group/{group}/node/{node}/attribute` | List attributes of a node |
//! | GET/POST/PUT/DELETE | `/node_group/{group}/node/{node}/attribute/{attribute}` | Read / create / update / remove an attribute |
//!
//! # Status codes
//!
//! Unknown names answer 404, duplicate names 409, malformed bodies 422,
//! and a failed push to the proxy 500 (the change itself is kept).
//! Group names and hosts the proxy configuration cannot carry, and
//! attribute changes that would make a node weight non-finite, are
//! rejected with 422 before anything is pushed.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use alb_control::ControlPlane;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub plane: Arc<ControlPlane>,
}

/// Build the registry router.
pub fn build_router(plane: Arc<ControlPlane>) -> Router {
    let state = ApiState { plane };

    Router::new()
        .route("/node_group", get(handlers::list_groups))
        .route(
            "/node_group/{group}",
            get(handlers::get_group)
                .post(handlers::create_group)
                .delete(handlers::delete_group),
        )
        .route("/node_group/{group}/node", get(handlers::list_nodes))
        .route(
            "/node_group/{group}/node/{node}",
            get(handlers::get_node)
                .post(handlers::create_node)
                .put(handlers::update_node)
                .delete(handlers::delete_node),
        )
        .route(
            "/node_group/{group}/node/{node}/attribute",
            get(handlers::list_attributes),
        )
        .route(
            "/node_group/{group}/node/{node}/attribute/{attribute}",
            get(handlers::get_attribute)
                .post(handlers::create_attribute)
                .put(handlers::update_attribute)
                .delete(handlers::delete_attribute),
        )
        .with_state(state)
}
