//! The request pipeline: an explicit, ordered chain of guards.
//!
//! Each guard looks at one [`GuardContext`] and either passes control
//! forward or terminates the request with a status + `{ success: false,
//! error }` body. The chain is a plain list run by a driver loop — no
//! nested "next" callbacks — and the first rejection wins. Fixed order:
//! request logger, api-key check, session-name validation,
//! session-existence validation, rate limiting.

use std::{net::SocketAddr, sync::Arc};

use {
    async_trait::async_trait,
    axum::{
        body::Body,
        extract::{ConnectInfo, RawPathParams, Request, State},
        http::{Method, header},
        middleware::Next,
        response::{IntoResponse, Response},
    },
    tracing::{debug, info},
};

use chatwire_sessions::{SessionEngine, SessionId};

use crate::{error::ApiError, rate_limit::RateLimiter, state::GatewayState};

/// Header carrying the client's API key.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";

/// Placeholder for absent request metadata.
const UNKNOWN: &str = "unknown";

// ── Chain machinery ──────────────────────────────────────────────────────────

/// What one guard decided.
pub enum Verdict {
    Continue,
    Reject(ApiError),
}

/// Everything a guard may inspect. Built once per request by the
/// pipeline driver; guards never see (or touch) the live request.
#[derive(Debug, Clone)]
pub struct GuardContext {
    pub method: Method,
    pub path: String,
    /// Client network address, the default rate-limit key.
    pub remote: String,
    pub access_token: Option<String>,
    pub user_agent: String,
    /// `sessionId` path parameter, when the route carries one.
    pub session_id: Option<String>,
    /// Buffered JSON body, present only for state-changing methods.
    pub body: Option<serde_json::Value>,
}

/// One stage of the request pipeline.
#[async_trait]
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;
    async fn evaluate(&self, ctx: &GuardContext) -> Verdict;
}

/// Ordered guard list. The first rejection ends the chain; guards after
/// it never run.
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    pub fn new(guards: Vec<Arc<dyn Guard>>) -> Self {
        Self { guards }
    }

    pub async fn run(&self, ctx: &GuardContext) -> Result<(), ApiError> {
        for guard in &self.guards {
            match guard.evaluate(ctx).await {
                Verdict::Continue => {},
                Verdict::Reject(error) => {
                    debug!(guard = guard.name(), error = %error, path = %ctx.path, "request rejected");
                    return Err(error);
                },
            }
        }
        Ok(())
    }
}

// ── Guards ───────────────────────────────────────────────────────────────────

/// Records every request; never rejects.
pub struct RequestLogger;

#[async_trait]
impl Guard for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    async fn evaluate(&self, ctx: &GuardContext) -> Verdict {
        info!(
            method = %ctx.method,
            path = %ctx.path,
            ip = %ctx.remote,
            user_agent = %ctx.user_agent,
            "request"
        );
        if let Some(body) = &ctx.body {
            info!(
                body = %serde_json::to_string_pretty(body).unwrap_or_default(),
                "request body"
            );
        }
        Verdict::Continue
    }
}

/// Checks the `access-token` header against the configured key.
///
/// No key configured means auth is disabled and everything passes —
/// the documented fail-open default. The comparison is constant time.
pub struct ApiKeyGuard {
    key: Option<String>,
}

impl ApiKeyGuard {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl Guard for ApiKeyGuard {
    fn name(&self) -> &'static str {
        "api_key"
    }

    async fn evaluate(&self, ctx: &GuardContext) -> Verdict {
        let Some(expected) = self.key.as_deref() else {
            return Verdict::Continue;
        };
        match ctx.access_token.as_deref() {
            Some(given) if safe_equal(given, expected) => Verdict::Continue,
            _ => Verdict::Reject(ApiError::Auth),
        }
    }
}

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // XOR each byte and accumulate; any difference makes result non-zero.
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

/// Validates the `sessionId` path parameter shape. Routes without the
/// parameter pass through.
pub struct SessionNameGuard;

#[async_trait]
impl Guard for SessionNameGuard {
    fn name(&self) -> &'static str {
        "session_name"
    }

    async fn evaluate(&self, ctx: &GuardContext) -> Verdict {
        let Some(raw) = ctx.session_id.as_deref() else {
            return Verdict::Continue;
        };
        match SessionId::parse(raw) {
            Ok(_) => Verdict::Continue,
            Err(_) => Verdict::Reject(ApiError::Validation),
        }
    }
}

/// Asks the engine whether the session exists; unknown ids 404 with the
/// engine's message verbatim.
pub struct SessionExistsGuard {
    engine: Arc<dyn SessionEngine>,
}

impl SessionExistsGuard {
    pub fn new(engine: Arc<dyn SessionEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Guard for SessionExistsGuard {
    fn name(&self) -> &'static str {
        "session_exists"
    }

    async fn evaluate(&self, ctx: &GuardContext) -> Verdict {
        let Some(id) = ctx.session_id.as_deref() else {
            return Verdict::Continue;
        };
        let validation = self.engine.validate(id).await;
        if validation.success {
            Verdict::Continue
        } else {
            Verdict::Reject(ApiError::NotFound(validation.message))
        }
    }
}

/// Admission control keyed by the client address.
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn evaluate(&self, ctx: &GuardContext) -> Verdict {
        match self.limiter.check(&ctx.remote) {
            Ok(()) => Verdict::Continue,
            Err(error) => Verdict::Reject(error),
        }
    }
}

// ── Axum adapters ────────────────────────────────────────────────────────────

/// Pipeline for routes that do not require an existing session
/// (`/session/start`, `/callback`).
pub async fn base_pipeline(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    drive(&state.base_chain, addr, &params, req, next).await
}

/// Pipeline for session-scoped routes that must name a known session.
pub async fn scoped_pipeline(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    drive(&state.scoped_chain, addr, &params, req, next).await
}

async fn drive(
    chain: &GuardChain,
    addr: SocketAddr,
    params: &RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    let session_id = params
        .iter()
        .find(|(name, _)| *name == "sessionId")
        .map(|(_, value)| value.to_string());

    let access_token = header_string(&req, ACCESS_TOKEN_HEADER);
    let user_agent =
        header_string(&req, header::USER_AGENT.as_str()).unwrap_or_else(|| UNKNOWN.into());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (req, body) = buffer_loggable_body(req).await;

    let ctx = GuardContext {
        method,
        path,
        remote: addr.ip().to_string(),
        access_token,
        user_agent,
        session_id,
        body,
    };

    match chain.run(&ctx).await {
        Ok(()) => next.run(req).await,
        Err(error) => error.into_response(),
    }
}

fn header_string(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Buffer the body of state-changing JSON requests so the logger can
/// record it, then hand the request back intact. Everything else passes
/// through untouched.
async fn buffer_loggable_body(req: Request) -> (Request, Option<serde_json::Value>) {
    let state_changing = matches!(req.method().as_str(), "POST" | "PUT" | "PATCH");
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !state_changing || !is_json {
        return (req, None);
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let value = serde_json::from_slice::<serde_json::Value>(&bytes)
                .ok()
                .filter(|v| v.as_object().is_none_or(|map| !map.is_empty()));
            (Request::from_parts(parts, Body::from(bytes)), value)
        },
        Err(_) => (Request::from_parts(parts, Body::empty()), None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chatwire_sessions::InMemoryEngine;

    use super::*;

    fn ctx(session_id: Option<&str>, token: Option<&str>) -> GuardContext {
        GuardContext {
            method: Method::GET,
            path: "/test".into(),
            remote: "127.0.0.1".into(),
            access_token: token.map(str::to_string),
            user_agent: UNKNOWN.into(),
            session_id: session_id.map(str::to_string),
            body: None,
        }
    }

    #[test]
    fn safe_equal_compares_exact_bytes() {
        assert!(safe_equal("rahasia", "rahasia"));
        assert!(!safe_equal("rahasia", "rahasiA"));
        assert!(!safe_equal("rahasia", "rahasia "));
        assert!(!safe_equal("", "x"));
        assert!(safe_equal("", ""));
    }

    #[tokio::test]
    async fn api_key_guard_disabled_without_key() {
        let guard = ApiKeyGuard::new(None);
        assert!(matches!(
            guard.evaluate(&ctx(None, None)).await,
            Verdict::Continue
        ));

        // Empty string counts as unconfigured.
        let guard = ApiKeyGuard::new(Some(String::new()));
        assert!(matches!(
            guard.evaluate(&ctx(None, Some("whatever"))).await,
            Verdict::Continue
        ));
    }

    #[tokio::test]
    async fn api_key_guard_rejects_missing_and_wrong_tokens() {
        let guard = ApiKeyGuard::new(Some("rahasia".into()));
        assert!(matches!(
            guard.evaluate(&ctx(None, None)).await,
            Verdict::Reject(ApiError::Auth)
        ));
        assert!(matches!(
            guard.evaluate(&ctx(None, Some("wrong"))).await,
            Verdict::Reject(ApiError::Auth)
        ));
        assert!(matches!(
            guard.evaluate(&ctx(None, Some("rahasia"))).await,
            Verdict::Continue
        ));
    }

    #[tokio::test]
    async fn session_name_guard_validates_only_when_present() {
        let guard = SessionNameGuard;
        assert!(matches!(
            guard.evaluate(&ctx(None, None)).await,
            Verdict::Continue
        ));
        assert!(matches!(
            guard.evaluate(&ctx(Some("ok-1_A"), None)).await,
            Verdict::Continue
        ));
        assert!(matches!(
            guard.evaluate(&ctx(Some("ABCD1@"), None)).await,
            Verdict::Reject(ApiError::Validation)
        ));
    }

    #[tokio::test]
    async fn session_exists_guard_surfaces_engine_message() {
        let engine = InMemoryEngine::new();
        let guard = SessionExistsGuard::new(engine);
        match guard.evaluate(&ctx(Some("ghost"), None)).await {
            Verdict::Reject(ApiError::NotFound(message)) => {
                assert_eq!(message, "session_not_found");
            },
            _ => panic!("expected a 404 rejection"),
        }
    }

    /// Guard that counts evaluations and always rejects.
    struct Tripwire(AtomicU32);

    #[async_trait]
    impl Guard for Tripwire {
        fn name(&self) -> &'static str {
            "tripwire"
        }

        async fn evaluate(&self, _ctx: &GuardContext) -> Verdict {
            self.0.fetch_add(1, Ordering::SeqCst);
            Verdict::Reject(ApiError::Auth)
        }
    }

    #[tokio::test]
    async fn chain_stops_at_first_rejection() {
        let first = Arc::new(Tripwire(AtomicU32::new(0)));
        let second = Arc::new(Tripwire(AtomicU32::new(0)));
        let chain = GuardChain::new(vec![
            Arc::clone(&first) as Arc<dyn Guard>,
            Arc::clone(&second) as Arc<dyn Guard>,
        ]);

        let result = chain.run(&ctx(None, None)).await;
        assert_eq!(result, Err(ApiError::Auth));
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 0);
    }
}
