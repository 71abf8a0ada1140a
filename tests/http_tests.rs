use rate_gate::admission::Coordinator;
use rate_gate::create_router;
use rate_gate::models::HealthResponse;
use rate_gate::registry::DispenserRegistry;
use rate_gate::state::AppState;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(300);

async fn spawn_app(window: Duration) -> String {
    let registry = Arc::new(DispenserRegistry::new(100, Duration::from_secs(60)));
    let state = Arc::new(AppState::new(Coordinator::new(registry), window));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn first_request_is_served() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK, 1 requests served\n");
}

#[tokio::test]
async fn second_request_within_window_is_rejected() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let start = Instant::now();
    let resp = client.get(format!("{}/again", base)).send().await.unwrap();
    assert!(start.elapsed() >= WINDOW);
    assert_eq!(resp.status().as_u16(), 429);
    assert_eq!(
        resp.headers().get("retry-after").unwrap().to_str().unwrap(),
        "1"
    );
    assert_eq!(
        resp.text().await.unwrap(),
        "one request per 300ms allowed, 1 requests timed out\n"
    );
}

#[tokio::test]
async fn token_is_back_after_window() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    tokio::time::sleep(WINDOW + Duration::from_millis(50)).await;
    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK, 2 requests served\n");
}

#[tokio::test]
async fn any_method_and_path_is_admitted() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    let resp = client
        .post(format!("{}/some/deep/path?x=1", base))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn health_reports_clients_and_counters() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    let health: HealthResponse = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.clients, 0);

    client.get(format!("{}/", base)).send().await.unwrap();

    let health: HealthResponse = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.clients, 1);
    assert_eq!(health.served, 1);
    assert_eq!(health.rejected, 0);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let base = spawn_app(WINDOW).await;
    let client = Client::new();

    client.get(format!("{}/", base)).send().await.unwrap();

    let resp = client.get(format!("{}/metrics", base)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("rate_gate_requests_total"));
    assert!(body.contains("rate_gate_admitted_total"));
}
