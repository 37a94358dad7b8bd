use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

use chrono::Utc;
use serial_test::serial;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_spanwatch")
}

fn write_dataset(temp: &Path) -> PathBuf {
    let path = temp.join("dataset.json");
    let dataset = testkit::sample_dataset(Utc::now());
    std::fs::write(&path, serde_json::to_vec(&dataset).unwrap()).unwrap();
    path
}

fn spanwatch(temp: &Path) -> Command {
    let mut cmd = Command::new(bin());
    cmd.env("SPANWATCH_CONFIG", temp.join("absent.toml"))
        .env_remove("SPANWATCH_HTTP_ADDR")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT");
    cmd
}

fn spawn_server(temp: &Path, dataset: Option<&Path>) -> (Child, u16, PathBuf) {
    let port = free_port();
    let db_path = temp.join("spanwatch.duckdb");

    let mut cmd = spanwatch(temp);
    cmd.arg("run")
        .arg("--db-path")
        .arg(&db_path)
        .arg("--http-addr")
        .arg(format!("127.0.0.1:{port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dataset) = dataset {
        cmd.arg("--dataset").arg(dataset);
    }

    (cmd.spawn().unwrap(), port, db_path)
}

async fn wait_ready(port: u16, child: &mut Child) {
    let client = reqwest::Client::new();
    let mut ready = false;
    for _ in 0..100 {
        assert!(child.try_wait().unwrap().is_none(), "spanwatch exited early");
        if let Ok(resp) = client
            .get(format!("http://127.0.0.1:{port}/healthz"))
            .send()
            .await
            && resp.status().is_success()
        {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(ready, "http api not ready");
}

fn query(temp: &Path, port: u16, args: &[&str]) -> Output {
    spanwatch(temp)
        .args(args)
        .arg("--addr")
        .arg(format!("127.0.0.1:{port}"))
        .output()
        .unwrap()
}

#[tokio::test]
#[serial]
async fn e2e_load_then_query_services() {
    let temp = tempfile::tempdir().unwrap();
    let dataset = write_dataset(temp.path());
    let db_path = temp.path().join("spanwatch.duckdb");

    let load = spanwatch(temp.path())
        .arg("load")
        .arg(&dataset)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .unwrap();
    assert!(load.status.success());
    assert!(String::from_utf8_lossy(&load.stdout).contains("dependencies=4"));

    let (mut child, port, _db) = spawn_server(temp.path(), None);
    wait_ready(port, &mut child).await;

    let output = query(temp.path(), port, &["services"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("checkout"));
    assert!(stdout.contains("-- 4 services --"));

    let output = query(temp.path(), port, &["--json", "graph"]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(value["edges"].as_array().unwrap().len(), 4);

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
#[serial]
async fn e2e_trace_detail_and_status_json_shape() {
    let temp = tempfile::tempdir().unwrap();
    let dataset = write_dataset(temp.path());
    let (mut child, port, _db) = spawn_server(temp.path(), Some(&dataset));
    wait_ready(port, &mut child).await;

    let output = query(temp.path(), port, &["trace", testkit::SAMPLE_TRACE_ID]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("TRACE {}", testkit::SAMPLE_TRACE_ID)));
    assert!(stdout.contains("checkout"));

    let output = query(temp.path(), port, &["--json", "status"]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["engine"], "duckdb");
    assert_eq!(value["dependencies"], 4);

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
#[serial]
async fn e2e_errors_reach_the_cli() {
    let temp = tempfile::tempdir().unwrap();
    let (mut child, port, _db) = spawn_server(temp.path(), None);
    wait_ready(port, &mut child).await;

    let output = query(temp.path(), port, &["service", "checkout"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not_found"));

    let resp = reqwest::Client::new()
        .get(format!(
            "http://127.0.0.1:{port}/api/services/list?time_range=7d"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_argument");
    assert!(body["timestamp"].is_i64());

    let _ = child.kill();
    let _ = child.wait();
}
