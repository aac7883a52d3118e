//! End-to-end control loop tests.
//!
//! Wires the same pieces `albd standalone` does: the registry API in front
//! of a control plane that pushes over HTTP to a live adapter, which
//! rewrites a temporary upstream file.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use alb_adapter::{CommandReloader, UpstreamStore};
use alb_control::ControlPlane;
use alb_sync::HttpSyncClient;
use alb_telemetry::{CommandExecutor, ExecError, Sweeper};

struct Harness {
    api: Router,
    plane: Arc<ControlPlane>,
    upstream_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness(reload: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let upstream_path = dir.path().join("upstream.conf");
    std::fs::write(
        &upstream_path,
        "# managed by albd\nupstream static {\n    server 10.9.9.9:80;\n}\n",
    )
    .unwrap();

    let reloader = Arc::new(CommandReloader::parse(reload).unwrap());
    let store = Arc::new(UpstreamStore::new(upstream_path.clone(), reloader));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, alb_adapter::build_router(store))
            .await
            .unwrap();
    });

    let sync = HttpSyncClient::new(format!("http://{addr}"));
    let plane = Arc::new(ControlPlane::new(Arc::new(sync)));

    Harness {
        api: alb_api::build_router(plane.clone()),
        plane,
        upstream_path,
        _dir: dir,
    }
}

fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn add_node(api: &Router, group: &str, node: &str, host: &str, base: f64) {
    let uri = format!("/node_group/{group}/node/{node}");
    let (status, _) = call(
        api,
        request("POST", &uri, Some(serde_json::json!({"host": host, "port": 80}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        api,
        request(
            "POST",
            &format!("{uri}/attribute/base"),
            Some(serde_json::json!({"value": base, "weight": 1.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn upstream(h: &Harness) -> String {
    std::fs::read_to_string(&h.upstream_path).unwrap()
}

#[tokio::test]
async fn attribute_change_reaches_upstream_file() {
    let h = harness("true").await;

    let (status, _) = call(&h.api, request("POST", "/node_group/web", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    add_node(&h.api, "web", "a", "10.0.0.1", 2.0).await;
    add_node(&h.api, "web", "b", "10.0.0.2", 8.0).await;

    // a: 2 + 50 * 0.1 = 7, b: 8
    let (status, _) = call(
        &h.api,
        request(
            "POST",
            "/node_group/web/node/a/attribute/cpu",
            Some(serde_json::json!({"value": 50.0, "weight": 0.1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, node) = call(&h.api, request("GET", "/node_group/web/node/a", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(node["weight"], 7.0);

    let contents = upstream(&h);
    assert!(contents.starts_with("# managed by albd\nupstream static {\n    server 10.9.9.9:80;\n}\n"));
    assert!(contents.contains(
        "upstream web {\n    server 10.0.0.1:80 weight=1;\n    server 10.0.0.2:80 weight=51;\n}\n"
    ));
}

#[tokio::test]
async fn removing_group_leaves_empty_block() {
    let h = harness("true").await;

    call(&h.api, request("POST", "/node_group/web", None)).await;
    add_node(&h.api, "web", "a", "10.0.0.1", 1.0).await;
    assert!(upstream(&h).contains("server 10.0.0.1:80 weight=1;"));

    let (status, _) = call(&h.api, request("DELETE", "/node_group/web", None)).await;
    assert_eq!(status, StatusCode::OK);

    let contents = upstream(&h);
    assert!(contents.contains("upstream web {\n}\n"));
    assert!(contents.contains("upstream static {"));
}

#[tokio::test]
async fn failed_reload_surfaces_500_but_keeps_change() {
    let h = harness("false").await;

    call(&h.api, request("POST", "/node_group/web", None)).await;
    let (status, body) = call(
        &h.api,
        request(
            "POST",
            "/node_group/web/node/a",
            Some(serde_json::json!({"host": "10.0.0.1", "port": 80})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let (status, _) = call(&h.api, request("GET", "/node_group/web/node/a", None)).await;
    assert_eq!(status, StatusCode::OK);
}

/// Reports 30% CPU for every host.
struct FlatCpu;

#[async_trait]
impl CommandExecutor for FlatCpu {
    async fn execute(&self, _host: &str, _command: &str) -> Result<String, ExecError> {
        Ok("30\n".to_string())
    }
}

#[tokio::test]
async fn sweep_drives_upstream_weights() {
    let h = harness("true").await;

    call(&h.api, request("POST", "/node_group/web", None)).await;
    add_node(&h.api, "web", "a", "10.0.0.1", 0.0).await;
    add_node(&h.api, "web", "b", "10.0.0.2", 5.0).await;
    for node in ["a", "b"] {
        let (status, _) = call(
            &h.api,
            request(
                "POST",
                &format!("/node_group/web/node/{node}/attribute/cpu"),
                Some(serde_json::json!({"value": 0.0, "weight": 1.0})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let sweeper = Sweeper::new(h.plane.clone(), Arc::new(FlatCpu));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 0);

    // a: 30, b: 35
    let contents = upstream(&h);
    assert!(contents.contains(
        "upstream web {\n    server 10.0.0.1:80 weight=1;\n    server 10.0.0.2:80 weight=51;\n}\n"
    ));
    assert_eq!(h.plane.node("web", "b").unwrap().weight, 35.0);
}
