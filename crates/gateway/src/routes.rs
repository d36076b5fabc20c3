//! HTTP handlers. Thin by design: the pipeline has already gated the
//! request, so handlers delegate to the engine and shape nothing beyond
//! the `{ success, … }` envelope.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, State},
        response::IntoResponse,
    },
    tracing::info,
};

use {
    chatwire_common::{
        types::MessageBody,
        wait::{WaitOptions, wait_for},
    },
    chatwire_sessions::{EngineError, SessionId},
};

use crate::{error::ApiError, state::GatewayState};

/// Unauthenticated liveness probe.
pub async fn ping() -> impl IntoResponse {
    Json(MessageBody::new("pong"))
}

/// Version + session count, for dashboards and load balancers.
pub async fn health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "sessions": state.engine.list().len(),
    }))
}

/// `GET /session/start/{sessionId}` — begin connecting, then wait for
/// the session to appear in the registry before answering.
pub async fn start_session(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = SessionId::parse(&session_id).map_err(|_| ApiError::Validation)?;
    state
        .engine
        .start(&id)
        .await
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    let engine = Arc::clone(&state.engine);
    wait_for(WaitOptions::default(), || engine.snapshot(id.as_str()))
        .await
        .map_err(|_| ApiError::Timeout("session failed to initialize".into()))?;

    Ok(Json(MessageBody::new("Session initiated successfully")))
}

/// `GET /session/status/{sessionId}` — current lifecycle state.
pub async fn session_status(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .engine
        .snapshot(&session_id)
        .ok_or_else(|| ApiError::NotFound("session_not_found".into()))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "state": snapshot.state,
    })))
}

/// `GET /session/qr/{sessionId}` — wait until the pairing QR exists.
///
/// The QR arrives asynchronously from the connection flow; this bridges
/// it into a synchronous-looking response, failing distinguishably when
/// the wait budget runs out.
pub async fn session_qr(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = Arc::clone(&state.engine);
    let qr = wait_for(WaitOptions::default(), || {
        engine.snapshot(&session_id).and_then(|s| s.qr)
    })
    .await
    .map_err(|_| ApiError::Timeout("qr code not generated in time".into()))?;

    Ok(Json(serde_json::json!({ "success": true, "qr": qr })))
}

/// `GET /session/terminate/{sessionId}` — tear the session down.
pub async fn terminate_session(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    match state.engine.terminate(&session_id).await {
        Ok(()) => Ok(Json(MessageBody::new("Logged out successfully"))),
        Err(EngineError::NotFound) => Err(ApiError::NotFound("session_not_found".into())),
    }
}

/// `POST /callback` — local callback sink, the counterpart of the
/// webhook dispatcher for loopback deployments and tests.
pub async fn local_callback(Json(payload): Json<serde_json::Value>) -> impl IntoResponse {
    info!(payload = %payload, "local callback received");
    Json(serde_json::json!({ "success": true }))
}
