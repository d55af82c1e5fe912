use httpmock::prelude::*;
use small_host::{HostConfig, HostEngine, HostError, RunningHost};
use tempfile::TempDir;

/// 在暫存目錄寫入 manifest，從 port 0 啟動 host
async fn start_host(dir: &TempDir, manifest: &str) -> small_host::Result<RunningHost> {
    let manifest_path = dir.path().join("host.toml");
    std::fs::write(&manifest_path, manifest).unwrap();

    let config = HostConfig::from_args(
        "127.0.0.1:0",
        manifest_path.to_str().unwrap(),
        dir.path().join("tmp").to_str().unwrap(),
        dir.path().join("logs").to_str().unwrap(),
    )
    .unwrap();

    HostEngine::new(config).start().await
}

#[tokio::test]
async fn test_static_route_and_well_known_endpoints() {
    let dir = TempDir::new().unwrap();
    let manifest = r#"
[application]
name = "static-demo"
version = "1.2.3"

[variables]
greeting = { default = "hello integration" }

[[trigger.http]]
route = "/"
component = "home"

[component.home.response]
body = "{{ greeting }}"
content_type = "text/plain"
headers = { x-app = "static-demo" }
"#;

    let running = start_host(&dir, manifest).await.unwrap();
    let base = format!("http://{}", running.addr());

    let response = reqwest::get(&base).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-app"], "static-demo");
    assert_eq!(response.text().await.unwrap(), "hello integration");

    let health = reqwest::get(format!("{base}/.well-known/small-host/health"))
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    let info: serde_json::Value = reqwest::get(format!("{base}/.well-known/small-host/info"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["name"], "static-demo");
    assert_eq!(info["version"], "1.2.3");

    let missing = reqwest::get(format!("{base}/nope")).await.unwrap();
    assert_eq!(missing.status(), 404);

    // lock 檔與 access log 落在指定目錄
    assert!(dir.path().join("tmp/app.lock").exists());
    let access_log = std::fs::read_to_string(dir.path().join("logs/access.log")).unwrap();
    assert!(access_log.contains("GET / 200"));
    assert!(access_log.contains("component=home"));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_file_serving_with_wildcard_route() {
    let dir = TempDir::new().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(assets.join("docs")).unwrap();
    std::fs::write(assets.join("index.html"), "<html>home</html>").unwrap();
    std::fs::write(assets.join("docs/guide.txt"), "read me").unwrap();

    let manifest = r#"
[application]
name = "files-demo"
version = "0.1.0"

[[trigger.http]]
route = "/assets/..."
component = "assets"

[component.assets.files]
source = "assets"
"#;

    let running = start_host(&dir, manifest).await.unwrap();
    let base = format!("http://{}", running.addr());

    let response = reqwest::get(format!("{base}/assets/docs/guide.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "read me");

    // 路由命中目錄時回 index
    let index = reqwest::get(format!("{base}/assets")).await.unwrap();
    assert_eq!(index.status(), 200);
    assert_eq!(index.text().await.unwrap(), "<html>home</html>");

    let missing = reqwest::get(format!("{base}/assets/nope.txt")).await.unwrap();
    assert_eq!(missing.status(), 404);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_proxy_forwards_to_upstream() {
    let upstream = MockServer::start();
    let widgets_mock = upstream.mock(|when, then| {
        when.method(GET)
            .path("/widgets/7")
            .query_param("details", "full")
            .header("x-request-id", "abc-123");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"id": 7, "name": "widget"}));
    });

    let dir = TempDir::new().unwrap();
    let manifest = format!(
        r#"
[application]
name = "proxy-demo"
version = "0.1.0"

[[trigger.http]]
route = "/api/..."
component = "backend"

[component.backend]
allowed_outbound_hosts = ["http://127.0.0.1:*"]

[component.backend.proxy]
upstream = "{upstream_url}"
"#,
        upstream_url = upstream.base_url()
    );

    let running = start_host(&dir, &manifest).await.unwrap();
    let base = format!("http://{}", running.addr());

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base}/api/widgets/7?details=full"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["name"], "widget");
    widgets_mock.assert();

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    // port 9 (discard) 上沒有人在聽
    let manifest = r#"
[application]
name = "proxy-demo"
version = "0.1.0"

[[trigger.http]]
route = "/api/..."
component = "backend"

[component.backend]
allowed_outbound_hosts = ["http://127.0.0.1:*"]

[component.backend.proxy]
upstream = "http://127.0.0.1:9/"
"#;

    let running = start_host(&dir, manifest).await.unwrap();
    let base = format!("http://{}", running.addr());

    let response = reqwest::get(format!("{base}/api/anything")).await.unwrap();
    assert_eq!(response.status(), 502);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_denied_upstream_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    let manifest = r#"
[application]
name = "proxy-demo"
version = "0.1.0"

[[trigger.http]]
route = "/api/..."
component = "backend"

[component.backend.proxy]
upstream = "http://forbidden.test/"
"#;

    let err = start_host(&dir, manifest).await.unwrap_err();
    assert!(matches!(err, HostError::OutboundDeniedError { .. }));
    assert_eq!(err.exit_status(), 1);
}

#[tokio::test]
async fn test_duplicate_routes_fail_at_startup() {
    let dir = TempDir::new().unwrap();
    let manifest = r#"
[application]
name = "dup-demo"
version = "0.1.0"

[[trigger.http]]
route = "/x"
component = "a"

[[trigger.http]]
route = "/x"
component = "b"

[component.a.response]
body = "a"

[component.b.response]
body = "b"
"#;

    let err = start_host(&dir, manifest).await.unwrap_err();
    assert!(matches!(err, HostError::RouteConflictError { .. }));
}

#[test]
fn test_run_maps_bad_arguments_to_exit_status() {
    // listen 位址無法解析 → 驗證錯誤 → 結束碼 1
    let status = small_host::run("not an address", "./app.toml", "./tmp", "./logs");
    assert_eq!(status, 1);
}
