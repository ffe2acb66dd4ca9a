//! Integration tests for the `cutover serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Helper: start `cutover serve` on the given port, optionally on a store file.
fn start_server(port: u16, store: Option<&Path>) -> Child {
    start_server_with_fixtures(port, store, None)
}

/// Helper: like `start_server`, seeding from a fixture directory.
fn start_server_with_fixtures(port: u16, store: Option<&Path>, fixtures: Option<&Path>) -> Child {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cutover"));
    cmd.current_dir(workspace_root);
    cmd.arg("serve")
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string());
    if let Some(store) = store {
        cmd.arg("--store").arg(store);
    }
    if let Some(fixtures) = fixtures {
        cmd.arg("--fixtures").arg(fixtures);
    }
    cmd.env_remove("CUTOVER_STORE");
    cmd.env_remove("CUTOVER_FIXTURES");
    cmd.env_remove("CUTOVER_PORT");
    cmd.env("RUST_LOG", "warn");
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start cutover serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

/// Copy the bundled fixtures into a temp dir with the project advanced to
/// `current_stage`.
fn fixtures_at_stage(current_stage: i64) -> tempfile::TempDir {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../core/fixtures/hotel-sys-api");
    let dir = tempfile::TempDir::new().unwrap();
    for entry in std::fs::read_dir(&source).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
    }
    let meta_path = dir.path().join("project-metadata.json");
    let mut meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&meta_path).unwrap()).unwrap();
    meta["current_stage"] = serde_json::json!(current_stage);
    std::fs::write(&meta_path, serde_json::to_string_pretty(&meta).unwrap()).unwrap();
    dir
}

fn stop(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

/// Helper: make a simple HTTP GET request and return (status, body).
fn http_get(port: u16, path: &str) -> (u16, String) {
    let (status, _, body) = http_get_with_headers(port, path, &[]);
    (status, body)
}

/// Helper: make an HTTP GET request with custom headers and return
/// (status, response_headers, body).
fn http_get_with_headers(
    port: u16,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n",
        path, port, header_lines
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response_full(&response)
}

fn get_json(port: u16, path: &str) -> (u16, serde_json::Value) {
    let (status, body) = http_get(port, path);
    let json = serde_json::from_str(&body)
        .unwrap_or_else(|e| panic!("invalid JSON from {}: {} ({})", path, e, body));
    (status, json)
}

/// Extract a header value from raw headers string.
fn extract_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().to_lowercase() == name_lower {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Parse an HTTP response into (status_code, headers_string, body).
fn parse_http_response_full(response: &str) -> (u16, String, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if extract_header(&headers, "transfer-encoding") == Some("chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, headers, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = if chunk_end + 2 <= remaining.len() {
            &remaining[chunk_end + 2..]
        } else {
            ""
        };
    }

    result
}

/// Project id seeded at startup, read from /health.
fn project_id(port: u16) -> String {
    let (status, json) = get_json(port, "/health");
    assert_eq!(status, 200);
    json["project_id"]
        .as_str()
        .expect("project_id in /health")
        .to_string()
}

#[test]
fn health_reports_seeded_project() {
    let port = next_port();
    let child = start_server(port, None);

    let (status, json) = get_json(port, "/health");
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert!(json["project_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn project_list_has_one_card_with_overall_progress() {
    let port = next_port();
    let child = start_server(port, None);

    let (status, json) = get_json(port, "/api/projects");
    stop(child);

    assert_eq!(status, 200);
    let projects = json["projects"].as_array().expect("projects array");
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "Hotel System API Migration");
    assert_eq!(projects[0]["overall_progress"], 68);
    assert_eq!(projects[0]["created"], "Jan 6, 2025");
}

#[test]
fn project_detail_lists_six_gated_stages() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(port, &format!("/api/projects/{}", id));
    stop(child);

    assert_eq!(status, 200);
    let stages = json["stages"].as_array().expect("stages array");
    assert_eq!(stages.len(), 6);
    assert_eq!(stages[2]["status"], "completed");
    assert_eq!(stages[2]["progress"], 100);
    assert_eq!(stages[3]["status"], "in_progress");
    assert_eq!(stages[3]["accessible"], true);
    assert_eq!(stages[3]["progress"], 75);
    assert_eq!(stages[4]["status"], "pending");
    assert_eq!(stages[4]["accessible"], false);
    assert_eq!(stages[4]["progress"], 30);
    assert_eq!(
        stages[0]["route"],
        format!("/projects/{}/repositories", id).as_str()
    );
}

#[test]
fn unknown_project_is_404() {
    let port = next_port();
    let child = start_server(port, None);

    let (status, json) = get_json(port, "/api/projects/no-such-project");
    stop(child);

    assert_eq!(status, 404);
    assert!(json["error"].as_str().unwrap().contains("no-such-project"));
}

#[test]
fn accessible_stage_returns_document() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(port, &format!("/api/projects/{}/stages/3", id));
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["locked"], false);
    assert_eq!(json["stage"]["title"], "Asset Manifest");
    assert_eq!(json["document"]["assets"].as_array().unwrap().len(), 9);
}

#[test]
fn locked_stage_returns_null_document() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(port, &format!("/api/projects/{}/stages/4", id));
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["locked"], true);
    assert!(json["document"].is_null());
    assert_eq!(json["stage"]["accessible"], false);
}

#[test]
fn unknown_stage_is_404() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status_7, _) = http_get(port, &format!("/api/projects/{}/stages/7", id));
    let (status_neg, _) = http_get(port, &format!("/api/projects/{}/stages/-1", id));
    let (status_word, _) = http_get(port, &format!("/api/projects/{}/stages/three", id));
    stop(child);

    assert_eq!(status_7, 404);
    assert_eq!(status_neg, 404);
    assert_eq!(status_word, 404);
}

#[test]
fn stage_summary_reports_headline_figures() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(port, &format!("/api/projects/{}/stages/2/summary", id));
    let (locked_status, locked) =
        get_json(port, &format!("/api/projects/{}/stages/5/summary", id));
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["summary"]["kind"], "architecture");
    assert_eq!(json["summary"]["estimated_hours"], 12);
    assert_eq!(locked_status, 200);
    assert_eq!(locked["locked"], true);
    assert!(locked["summary"].is_null());
}

#[test]
fn runtime_config_selects_environment() {
    let fixtures = fixtures_at_stage(4);
    let port = next_port();
    let child = start_server_with_fixtures(port, None, Some(fixtures.path()));
    let id = project_id(port);

    let (default_status, default_env) =
        get_json(port, &format!("/api/projects/{}/stages/4/runtime", id));
    let (prod_status, prod) = get_json(
        port,
        &format!("/api/projects/{}/stages/4/runtime?env=production", id),
    );
    let (unknown_status, unknown) =
        get_json(port, &format!("/api/projects/{}/stages/4/runtime?env=qa", id));
    let (wrong_stage_status, _) =
        http_get(port, &format!("/api/projects/{}/stages/3/runtime", id));
    stop(child);

    assert_eq!(default_status, 200);
    assert_eq!(default_env["environment"], "development");
    assert_eq!(default_env["config"]["database"]["max_connections"], 10);
    assert_eq!(default_env["config"]["security"]["ssl_enabled"], false);
    assert_eq!(default_env["available"].as_array().unwrap().len(), 3);

    assert_eq!(prod_status, 200);
    assert_eq!(prod["environment"], "production");
    assert_eq!(prod["config"]["database"]["max_connections"], 100);

    assert_eq!(unknown_status, 404);
    assert!(unknown["error"].as_str().unwrap().contains("qa"));
    assert_eq!(wrong_stage_status, 404);
}

#[test]
fn runtime_config_is_locked_before_stage_four() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(
        port,
        &format!("/api/projects/{}/stages/4/runtime?env=staging", id),
    );
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["locked"], true);
    assert!(json["config"].is_null());
}

#[test]
fn assets_filter_and_paginate() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (status, json) = get_json(
        port,
        &format!(
            "/api/projects/{}/stages/3/assets?type=integration_flow&limit=2",
            id
        ),
    );
    let (second_status, second) = get_json(
        port,
        &format!(
            "/api/projects/{}/stages/3/assets?type=integration_flow&offset=2&limit=2",
            id
        ),
    );
    let (wrong_stage, _) = http_get(port, &format!("/api/projects/{}/stages/2/assets", id));
    stop(child);

    assert_eq!(status, 200);
    assert_eq!(json["total"], 3);
    assert_eq!(json["assets"].as_array().unwrap().len(), 2);
    assert_eq!(json["summary"]["needs_configuration"], 2);
    assert_eq!(second_status, 200);
    assert_eq!(second["assets"].as_array().unwrap().len(), 1);
    assert_eq!(wrong_stage, 404);
}

#[test]
fn environments_and_pipeline_history() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (env_status, envs) = get_json(port, &format!("/api/projects/{}/environments", id));
    let (all_status, all) =
        get_json(port, &format!("/api/projects/{}/pipeline-executions", id));
    let (_, stage_two) = get_json(
        port,
        &format!("/api/projects/{}/pipeline-executions?stage=2", id),
    );
    let (_, limited) = get_json(
        port,
        &format!("/api/projects/{}/pipeline-executions?limit=1", id),
    );
    let (_, zero) = get_json(
        port,
        &format!("/api/projects/{}/pipeline-executions?limit=0", id),
    );
    let (_, huge) = get_json(
        port,
        &format!("/api/projects/{}/pipeline-executions?limit=100000", id),
    );
    stop(child);

    assert_eq!(env_status, 200);
    assert_eq!(envs["summary"]["total"], 3);
    assert_eq!(envs["document"]["environments"][0]["name"], "Development");

    assert_eq!(all_status, 200);
    assert_eq!(all["total"], 5);
    assert_eq!(stage_two["total"], 2);
    let runs = stage_two["executions"].as_array().unwrap();
    assert!(runs.iter().all(|r| r["stage_number"] == 2));
    // Most recent first.
    assert_eq!(limited["executions"].as_array().unwrap().len(), 1);
    assert_eq!(limited["executions"][0]["stage_number"], 3);
    assert_eq!(all["limit"], 50);
    assert_eq!(zero["limit"], 1);
    assert_eq!(zero["executions"].as_array().unwrap().len(), 1);
    assert_eq!(huge["limit"], 200);
    assert_eq!(huge["executions"].as_array().unwrap().len(), 5);
}

#[test]
fn navigate_gates_locked_stages() {
    let port = next_port();
    let child = start_server(port, None);
    let id = project_id(port);

    let (_, open) = get_json(port, &format!("/api/navigate?path=/projects/{}/stage3", id));
    let (_, locked) = get_json(port, &format!("/api/navigate?path=/projects/{}/stage4", id));
    let (_, unknown) = get_json(port, "/api/navigate?path=/nowhere");
    let (_, missing) = get_json(port, "/api/navigate?path=/projects/nope/stage1");
    stop(child);

    assert_eq!(open["path"], format!("/projects/{}/stage3", id).as_str());
    assert_eq!(open["redirected"], false);
    assert_eq!(locked["path"], format!("/projects/{}", id).as_str());
    assert_eq!(locked["route"]["kind"], "dashboard");
    assert_eq!(locked["redirected"], true);
    assert_eq!(unknown["path"], "/");
    assert_eq!(missing["route"]["kind"], "project_list");
}

#[test]
fn raw_stage_endpoint_uses_etag() {
    let port = next_port();
    let child = start_server(port, None);

    let (status, headers, body) = http_get_with_headers(port, "/api/stages/0", &[]);
    let etag = extract_header(&headers, "etag")
        .expect("ETag header")
        .to_string();
    let (cached, _, _) =
        http_get_with_headers(port, "/api/stages/0", &[("If-None-Match", etag.as_str())]);
    let (stale, _, _) =
        http_get_with_headers(port, "/api/stages/0", &[("If-None-Match", "\"stale\"")]);
    let (absent, _) = http_get(port, "/api/stages/6");
    stop(child);

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["repositories"].as_array().unwrap().len(), 3);
    assert_eq!(cached, 304);
    assert_eq!(stale, 200);
    assert_eq!(absent, 404);
}

#[test]
fn unmatched_route_is_json_404() {
    let port = next_port();
    let child = start_server(port, None);

    let (status, json) = get_json(port, "/definitely/not/here");
    stop(child);

    assert_eq!(status, 404);
    assert_eq!(json["error"], "not found");
}

#[test]
fn restart_on_same_store_does_not_reseed() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    let port = next_port();
    let child = start_server(port, Some(&store));
    let first = project_id(port);
    stop(child);

    let port = next_port();
    let child = start_server(port, Some(&store));
    let second = project_id(port);
    let (_, json) = get_json(port, "/api/projects");
    stop(child);

    assert_eq!(first, second);
    assert_eq!(json["projects"].as_array().unwrap().len(), 1);
}
