//! Tests de integración de la API de tareas
//! tests/api_test.rs
//!
//! Cada test levanta el servidor real en un puerto efímero y le habla
//! por TCP, igual que lo haría un cliente HTTP.

use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use task_server::config::Config;
use task_server::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Servidor corriendo en segundo plano
struct TestServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(workload_secs: u64) -> Self {
        let config = Config {
            workload_min_secs: workload_secs,
            workload_max_secs: workload_secs,
            poll_interval_ms: 100,
            shutdown_timeout_secs: 5,
            ..Config::default()
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, rx) = oneshot::channel();

        let handle = tokio::spawn(Server::new(config).serve(listener, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            stop: Some(stop),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

/// Respuesta HTTP ya separada en partes
struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl HttpResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Helper: envía un request y parsea la response completa
async fn send_request(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = match body {
        Some(body) => format!(
            "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            method,
            path,
            body.len(),
            body
        ),
        None => format!("{} {} HTTP/1.1\r\nHost: localhost\r\n\r\n", method, path),
    };
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    HttpResponse {
        status,
        headers,
        body: body.to_string(),
    }
}

async fn create(addr: SocketAddr, name: &str) -> HttpResponse {
    let body = serde_json::json!({ "name": name }).to_string();
    send_request(addr, "POST", "/api/v1/task/create", Some(&body)).await
}

// ==================== Ciclo de vida ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_get_list_delete() {
    let server = TestServer::start(300).await;

    let created = create(server.addr, "Alpha").await;
    assert_eq!(created.status, 202);
    let task = created.json();
    let id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["name"], "Alpha");
    assert_eq!(task["status"], "PROCESSING");
    assert_eq!(created.header("Location"), Some(format!("/api/v1/task/{}", id).as_str()));

    let fetched = send_request(server.addr, "GET", &format!("/api/v1/task/{}", id), None).await;
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.json()["status"], "PROCESSING");
    assert!(fetched.json()["processing_time"].as_u64().is_some());

    let listed = send_request(server.addr, "GET", "/api/v1/tasks", None).await;
    assert_eq!(listed.status, 200);
    let tasks = listed.json()["tasks"].as_array().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());

    let deleted = send_request(server.addr, "DELETE", &format!("/api/v1/task/{}", id), None).await;
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_empty());

    let gone = send_request(server.addr, "GET", &format!("/api/v1/task/{}", id), None).await;
    assert_eq!(gone.status, 404);
    assert_eq!(gone.json()["error"], "task_not_found");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_short_workload_reaches_done() {
    let server = TestServer::start(1).await;

    let id = create(server.addr, "Beta").await.json()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let mut last = None;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let task = send_request(server.addr, "GET", &format!("/api/v1/task/{}", id), None)
            .await
            .json();
        if task["status"] != "PROCESSING" {
            last = Some(task);
            break;
        }
    }

    let task = last.expect("task never finished");
    assert_eq!(task["status"], "DONE");
    assert!(task["processing_time"].as_u64().unwrap() >= 1_000_000_000);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_processing_time_grows() {
    let server = TestServer::start(300).await;
    let id = create(server.addr, "growing").await.json()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let path = format!("/api/v1/task/{}", id);

    let first = send_request(server.addr, "GET", &path, None).await.json()["processing_time"]
        .as_u64()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = send_request(server.addr, "GET", &path, None).await.json()["processing_time"]
        .as_u64()
        .unwrap();

    assert!(second > first);

    server.stop().await;
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let server = TestServer::start(300).await;
    create(server.addr, "running").await;

    let processing = send_request(server.addr, "GET", "/api/v1/tasks?status=PROCESSING", None).await;
    assert_eq!(processing.status, 200);
    assert_eq!(processing.json()["tasks"].as_array().unwrap().len(), 1);

    let done = send_request(server.addr, "GET", "/api/v1/tasks?status=done", None).await;
    assert!(done.json()["tasks"].as_array().unwrap().is_empty());

    let bad = send_request(server.addr, "GET", "/api/v1/tasks?status=nope", None).await;
    assert_eq!(bad.status, 400);
    assert_eq!(bad.json()["error"], "validation_error");

    server.stop().await;
}

// ==================== Errores ====================

#[tokio::test]
async fn test_invalid_id_is_bad_request() {
    let server = TestServer::start(300).await;

    for method in ["GET", "DELETE"] {
        let response = send_request(server.addr, method, "/api/v1/task/not-a-uuid", None).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.json()["error"], "invalid_id");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_validation_errors() {
    let server = TestServer::start(300).await;
    let too_long = serde_json::json!({ "name": "x".repeat(101) }).to_string();

    for body in ["{}", "{\"name\":\"\"}", "nope", too_long.as_str()] {
        let response = send_request(server.addr, "POST", "/api/v1/task/create", Some(body)).await;
        assert_eq!(response.status, 400, "body: {}", body);
        assert_eq!(response.json()["error"], "validation_error");
        assert!(response.json()["message"].is_string());
    }

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let server = TestServer::start(300).await;

    let missing = send_request(server.addr, "GET", "/api/v2/nothing", None).await;
    assert_eq!(missing.status, 404);

    let wrong = send_request(server.addr, "PUT", "/api/v1/tasks", None).await;
    assert_eq!(wrong.status, 405);
    assert_eq!(wrong.header("Allow"), Some("GET"));

    server.stop().await;
}

// ==================== Infraestructura ====================

#[tokio::test]
async fn test_health_and_headers() {
    let server = TestServer::start(300).await;

    let response = send_request(server.addr, "GET", "/api/v1/health", None).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json()["status"], "healthy");
    assert_eq!(response.header("Connection"), Some("close"));
    assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    assert!(response.header("X-Request-Id").is_some());
    assert!(response.header("X-Worker-Pid").is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_metrics_count_requests_and_tasks() {
    let server = TestServer::start(300).await;

    create(server.addr, "measured").await;
    send_request(server.addr, "GET", "/api/v1/tasks", None).await;

    let metrics = send_request(server.addr, "GET", "/metrics", None).await.json();

    assert!(metrics["server"]["total_requests"].as_u64().unwrap() >= 2);
    assert_eq!(metrics["tasks"]["total"], 1);
    assert_eq!(metrics["tasks"]["processing"], 1);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_ids() {
    let server = TestServer::start(300).await;
    let addr = server.addr;

    let handles: Vec<_> = (0..10)
        .map(|i| tokio::spawn(async move { create(addr, &format!("Concurrent Task {}", i)).await }))
        .collect();

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status, 202);
        ids.insert(response.json()["id"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 10);

    let listed = send_request(addr, "GET", "/api/v1/tasks", None).await.json();
    assert_eq!(listed["tasks"].as_array().unwrap().len(), 10);

    server.stop().await;
}
