//! End-to-end tests against the running HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use content_gateway::config::schema::{CategoryLimit, GatewayConfig};
use content_gateway::generation::provider::Provider;
use content_gateway::generation::types::ProviderErrorKind;
use content_gateway::generation::GenerationEngine;
use content_gateway::http::HttpServer;
use content_gateway::lifecycle::Shutdown;

mod common;
use common::{breaker, fast_retry, MockProvider};

/// Boot the gateway on an ephemeral port with mock providers.
async fn start_server(
    config: GatewayConfig,
    providers: Vec<Arc<dyn Provider>>,
) -> (SocketAddr, Shutdown) {
    let engine = Arc::new(GenerationEngine::with_providers(
        providers,
        breaker(5, 10_000),
        breaker(10, 10_000),
        fast_retry(1),
    ));

    let shutdown = Shutdown::new();
    let server = HttpServer::with_engine(config, engine, &shutdown)
        .await
        .expect("server construction");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn tight_content_quota(max_requests: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.categories.insert(
        "ai-content".to_string(),
        CategoryLimit {
            max_requests,
            window_ms: 60_000,
        },
    );
    config
}

#[tokio::test]
async fn test_generate_reports_winning_provider() {
    let a = MockProvider::always_err("a", 1, ProviderErrorKind::ServiceUnavailable);
    let b = MockProvider::always_ok("b", 2, "Fresh roast, fast delivery.");
    let (addr, shutdown) =
        start_server(GatewayConfig::default(), vec![a as Arc<dyn Provider>, b]).await;

    let res = client()
        .post(format!("http://{}/api/content/generate", addr))
        .json(&serde_json::json!({"prompt": "espresso tagline"}))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-ratelimit-limit"));
    assert!(res.headers().contains_key("x-request-id"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["provider"], "b");
    assert_eq!(body["content"], "Fresh roast, fast delivery.");

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_denies_with_standard_headers() {
    let a = MockProvider::always_ok("a", 1, "ok");
    let (addr, shutdown) = start_server(tight_content_quota(2), vec![a as Arc<dyn Provider>]).await;

    let http = client();
    let url = format!("http://{}/api/content/generate", addr);

    for _ in 0..2 {
        let res = http
            .post(&url)
            .header("x-client-id", "tester")
            .json(&serde_json::json!({"prompt": "p"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    let res = http
        .post(&url)
        .header("x-client-id", "tester")
        .json(&serde_json::json!({"prompt": "p"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(res.headers()["x-ratelimit-limit"], "2");
    let retry_after: u64 = res.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after <= 60);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rate limit exceeded");

    shutdown.trigger();
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let a = MockProvider::always_ok("a", 1, "ok");
    let (addr, shutdown) =
        start_server(GatewayConfig::default(), vec![a.clone() as Arc<dyn Provider>]).await;

    let res = client()
        .post(format!("http://{}/api/content/generate", addr))
        .json(&serde_json::json!({"prompt": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(a.calls(), 0, "validation failures must not reach providers");

    shutdown.trigger();
}

#[tokio::test]
async fn test_exhaustion_returns_generic_bad_gateway() {
    let a = MockProvider::always_err("a", 1, ProviderErrorKind::ServiceUnavailable);
    let b = MockProvider::always_err("b", 2, ProviderErrorKind::Timeout);
    let (addr, shutdown) =
        start_server(GatewayConfig::default(), vec![a as Arc<dyn Provider>, b]).await;

    let res = client()
        .post(format!("http://{}/api/content/generate", addr))
        .json(&serde_json::json!({"prompt": "p"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    let text = res.text().await.unwrap();
    // Full failure detail belongs in logs, never in the user response.
    assert!(!text.contains("scripted failure"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_and_status_endpoints() {
    let a = MockProvider::always_ok("a", 1, "ok");
    let b = MockProvider::always_ok("b", 2, "ok");
    let (addr, shutdown) =
        start_server(GatewayConfig::default(), vec![a as Arc<dyn Provider>, b]).await;

    let http = client();

    let res = http
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let res = http
        .get(format!("http://{}/api/status", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["generation"]["providers"].as_array().unwrap().len(), 2);
    assert_eq!(body["generation"]["global"]["state"], "closed");
    assert_eq!(body["rate_limit"]["enabled"], true);

    shutdown.trigger();
}
