use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        middleware,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    chatwire_config::ChatwireConfig, chatwire_sessions::InMemoryEngine,
    chatwire_webhooks::WebhookBridge,
};

use crate::{guard, routes, state::GatewayState};

/// Build the gateway router (shared between production startup and
/// tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that need no existing session: the base pipeline skips the
    // existence check (start must work before the session exists).
    let base = Router::new()
        .route("/session/start/{sessionId}", get(routes::start_session))
        .route("/callback", post(routes::local_callback))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            guard::base_pipeline,
        ));

    // Session-scoped routes that must name a known session.
    let scoped = Router::new()
        .route("/session/status/{sessionId}", get(routes::session_status))
        .route("/session/qr/{sessionId}", get(routes::session_qr))
        .route(
            "/session/terminate/{sessionId}",
            get(routes::terminate_session),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            guard::scoped_pipeline,
        ));

    Router::new()
        .route("/ping", get(routes::ping))
        .route("/health", get(routes::health))
        .merge(base)
        .merge(scoped)
        .layer(cors)
        .with_state(state)
}

/// Start the gateway HTTP server with the default in-memory engine.
pub async fn start_gateway(config: ChatwireConfig) -> anyhow::Result<()> {
    // Simulated connector: freshly started sessions produce a QR shortly
    // after, standing in for the out-of-process protocol client.
    let engine = InMemoryEngine::simulated(200);

    if let Some(base_url) = config.webhooks.base_url.as_deref() {
        info!(base_url, "webhook delivery enabled");
        let bridge = Arc::new(WebhookBridge::from_config(&config)?);
        engine.set_sink(bridge).await;
    }

    if config
        .gateway
        .api_key
        .as_deref()
        .is_none_or(|k| k.is_empty())
    {
        warn!("no api_key configured: request auth is DISABLED and webhooks go out unsigned");
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = GatewayState::new(config, engine);

    // Periodic eviction of idle rate-limit windows.
    let sweep_limiter = Arc::clone(&state.limiter);
    let sweep_every = Duration::from_millis(state.config.rate_limit.window_ms.max(1000));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sweep_limiter.sweep();
        }
    });

    let app = build_gateway_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("chatwire gateway v{}", state.version),
        format!("listening on {addr}"),
        format!(
            "rate limit: {} req / {} ms",
            state.config.rate_limit.max, state.config.rate_limit.window_ms
        ),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // ConnectInfo gives the pipeline its remote-IP rate-limit key.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
