//! End-to-end pipeline tests against a real listener.
//!
//! Each test binds its own ephemeral-port server so guard chains and
//! rate-limit counters are isolated.

use std::{net::SocketAddr, sync::Arc};

use {
    chatwire_config::ChatwireConfig,
    chatwire_gateway::{server::build_gateway_app, state::GatewayState},
    chatwire_sessions::{InMemoryEngine, SessionId},
    chatwire_webhooks::WebhookBridge,
};

async fn spawn_app(config: ChatwireConfig, engine: Arc<InMemoryEngine>) -> String {
    let state = GatewayState::new(config, engine);
    let app = build_gateway_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });
    format!("http://{addr}")
}

fn secured_config() -> ChatwireConfig {
    let mut config = ChatwireConfig::default();
    config.gateway.api_key = Some("rahasia".into());
    config
}

fn sid(raw: &str) -> SessionId {
    SessionId::parse(raw).unwrap()
}

#[tokio::test]
async fn ping_needs_no_token() {
    let base = spawn_app(secured_config(), InMemoryEngine::new()).await;

    let response = reqwest::get(format!("{base}/ping")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true, "message": "pong" })
    );
}

#[tokio::test]
async fn missing_or_wrong_token_is_401() {
    let base = spawn_app(secured_config(), InMemoryEngine::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/session/start/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": false, "error": "Invalid Access Token" })
    );

    let response = client
        .get(format!("{base}/session/start/1"))
        .header("access-token", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn no_configured_key_disables_auth() {
    let base = spawn_app(ChatwireConfig::default(), InMemoryEngine::new()).await;

    let response = reqwest::get(format!("{base}/session/start/1")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true, "message": "Session initiated successfully" })
    );
}

#[tokio::test]
async fn malformed_session_id_is_422() {
    let base = spawn_app(secured_config(), InMemoryEngine::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/session/start/ABCD1@"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": false, "error": "Session should be alphanumerical or -" })
    );
}

#[tokio::test]
async fn unknown_session_is_404_with_engine_message() {
    let base = spawn_app(secured_config(), InMemoryEngine::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/session/status/ghost"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": false, "error": "session_not_found" })
    );
}

#[tokio::test]
async fn requests_over_the_limit_are_429() {
    let mut config = secured_config();
    config.rate_limit.max = 2;
    config.rate_limit.window_ms = 60_000;
    let message = config.rate_limit.message.clone();
    let base = spawn_app(config, InMemoryEngine::new()).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client
            .get(format!("{base}/session/start/1"))
            .header("access-token", "rahasia")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = client
        .get(format!("{base}/session/start/1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": false, "error": message })
    );
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let engine = InMemoryEngine::new();
    let base = spawn_app(secured_config(), Arc::clone(&engine)).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/session/start/s1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{base}/session/status/s1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true, "state": "starting" })
    );

    // The connection flow produces a QR; the handler's wait picks it up.
    engine.set_qr(&sid("s1"), "qr-blob").await.unwrap();
    let response = client
        .get(format!("{base}/session/qr/s1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true, "qr": "qr-blob" })
    );

    let response = client
        .get(format!("{base}/session/terminate/s1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true, "message": "Logged out successfully" })
    );

    // The session is gone now; the scoped pipeline rejects.
    let response = client
        .get(format!("{base}/session/terminate/s1"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn session_events_reach_the_webhook_receiver() {
    let mut webhook_server = mockito::Server::new_async().await;
    let hook = webhook_server
        .mock("POST", "/hook/s9")
        .match_header("content-type", "application/json")
        .match_header(
            "x-webhook-signature",
            mockito::Matcher::Regex("^sha256=[0-9a-f]{64}$".into()),
        )
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;

    let mut config = secured_config();
    config.webhooks.base_url = Some(format!("{}/hook", webhook_server.url()));

    let engine = InMemoryEngine::new();
    let bridge = Arc::new(WebhookBridge::from_config(&config).unwrap());
    engine.set_sink(bridge).await;

    let base = spawn_app(config, Arc::clone(&engine)).await;
    let response = reqwest::Client::new()
        .get(format!("{base}/session/start/s9"))
        .header("access-token", "rahasia")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // start emits state_change; the QR event follows the same path.
    engine.set_qr(&sid("s9"), "qr-blob").await.unwrap();

    hook.assert_async().await;
}

#[tokio::test]
async fn local_callback_echoes_success() {
    let base = spawn_app(secured_config(), InMemoryEngine::new()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/callback"))
        .header("access-token", "rahasia")
        .json(&serde_json::json!({ "sessionId": "1", "event": "qr", "data": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "success": true })
    );
}
