//! HTTP surface integration tests
//!
//! Runs the producer and monitor servers on ephemeral ports over a shared
//! SQLite store and drives them with a real HTTP client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use taskq_api_http::{monitor_router, producer_router, HttpServer, HttpServerConfig, HttpServerHandle};
use taskq_core::application::{
    ProducerService, QueueEngine, QueueMonitor, RetryPolicy, Worker, WorkerConfig, WorkerOutcome,
};
use taskq_core::port::id_provider::TimestampIdProvider;
use taskq_core::port::task_executor::mocks::MockTaskExecutor;
use taskq_core::port::time_provider::SystemTimeProvider;
use taskq_core::port::ClaimTimeout;
use taskq_daemon::connect_store;

struct Harness {
    db_path: PathBuf,
    engine: QueueEngine,
    producer: HttpServerHandle,
    monitor: HttpServerHandle,
    client: reqwest::Client,
}

impl Harness {
    async fn start(name: &str) -> Self {
        let db_path =
            std::env::temp_dir().join(format!("taskq_http_{}_{}.db", name, std::process::id()));
        let _ = std::fs::remove_file(&db_path);
        let store = connect_store(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();
        let engine = QueueEngine::new(store);

        let producer_service = ProducerService::new(
            engine.clone(),
            Arc::new(TimestampIdProvider::new()),
            Arc::new(SystemTimeProvider),
        );
        let monitor_service = QueueMonitor::new(engine.clone());

        let local = HttpServerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
        };
        let producer = HttpServer::new(local.clone(), producer_router(Arc::new(producer_service)))
            .start()
            .await
            .unwrap();
        let monitor = HttpServer::new(local, monitor_router(Arc::new(monitor_service)))
            .start()
            .await
            .unwrap();

        Self {
            db_path,
            engine,
            producer,
            monitor,
            client: reqwest::Client::new(),
        }
    }

    fn producer_url(&self, path: &str) -> String {
        format!("http://{}{}", self.producer.local_addr(), path)
    }

    fn monitor_url(&self, path: &str) -> String {
        format!("http://{}{}", self.monitor.local_addr(), path)
    }

    async fn stats(&self) -> serde_json::Value {
        let resp = self.client.get(self.monitor_url("/stats")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        resp.json().await.unwrap()
    }

    async fn stop(self) {
        self.producer.stop().await.unwrap();
        self.monitor.stop().await.unwrap();
        let _ = std::fs::remove_file(&self.db_path);
    }
}

#[tokio::test]
async fn test_submit_then_observe_depths() {
    let harness = Harness::start("observe").await;

    let resp = harness
        .client
        .post(harness.producer_url("/task"))
        .json(&serde_json::json!({"type": "Email", "payload": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "queued");
    let task_id = body["task_id"].as_str().unwrap().to_string();
    assert!(!task_id.is_empty());

    let stats = harness.stats().await;
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["processing"], 0);
    assert_eq!(stats["status"], "healthy");

    let worker = Worker::new(
        harness.engine.clone(),
        Arc::new(MockTaskExecutor::new_success()),
        RetryPolicy::default(),
        WorkerConfig {
            claim_timeout: ClaimTimeout::After(Duration::from_millis(200)),
            ..WorkerConfig::default()
        },
    );
    assert_eq!(
        worker.process_next().await.unwrap(),
        WorkerOutcome::Completed { task_id }
    );

    let stats = harness.stats().await;
    assert_eq!(stats["pending"], 0);
    assert_eq!(stats["processing"], 0);
    assert_eq!(stats["dead_letter"], 0);

    harness.stop().await;
}

#[tokio::test]
async fn test_producer_rejects_bad_requests() {
    let harness = Harness::start("reject").await;

    let malformed = harness
        .client
        .post(harness.producer_url("/task"))
        .body("{\"type\":")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

    let wrong_method = harness
        .client
        .get(harness.producer_url("/task"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(harness.stats().await["pending"], 0);

    harness.stop().await;
}

#[tokio::test]
async fn test_dashboard_served() {
    let harness = Harness::start("dashboard").await;

    let resp = harness
        .client
        .get(harness.monitor_url("/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("System Healthy"));
    assert!(html.contains("Last updated:"));

    harness.stop().await;
}

#[tokio::test]
async fn test_stress_burst_all_accepted() {
    let harness = Harness::start("stress").await;
    let types = ["Email", "Resize", "Export"];

    let mut handles = Vec::new();
    for i in 0..50 {
        let client = harness.client.clone();
        let url = harness.producer_url("/task");
        let body = serde_json::json!({
            "type": types[i % types.len()],
            "payload": format!("stress-test-data-{}", i),
        });
        handles.push(tokio::spawn(async move {
            client.post(url).json(&body).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), reqwest::StatusCode::ACCEPTED);
    }

    assert_eq!(harness.stats().await["pending"], 50);

    harness.stop().await;
}
