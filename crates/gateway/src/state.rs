use std::{sync::Arc, time::Duration};

use {chatwire_config::ChatwireConfig, chatwire_sessions::SessionEngine};

use crate::{
    guard::{
        ApiKeyGuard, Guard, GuardChain, RateLimitGuard, RequestLogger, SessionExistsGuard,
        SessionNameGuard,
    },
    rate_limit::RateLimiter,
};

/// Shared gateway runtime state, wrapped in Arc for use across async
/// tasks. Everything here is constructed once at startup; the config is
/// immutable and the guard chains never change afterwards.
pub struct GatewayState {
    pub config: ChatwireConfig,
    pub engine: Arc<dyn SessionEngine>,
    pub limiter: Arc<RateLimiter>,
    /// Pipeline for routes that need no existing session.
    pub base_chain: GuardChain,
    /// Pipeline for routes that must name a known session.
    pub scoped_chain: GuardChain,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(config: ChatwireConfig, engine: Arc<dyn SessionEngine>) -> Arc<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max,
            Duration::from_millis(config.rate_limit.window_ms),
            config.rate_limit.message.clone(),
        ));

        let logger: Arc<dyn Guard> = Arc::new(RequestLogger);
        let api_key: Arc<dyn Guard> = Arc::new(ApiKeyGuard::new(config.gateway.api_key.clone()));
        let name: Arc<dyn Guard> = Arc::new(SessionNameGuard);
        let exists: Arc<dyn Guard> = Arc::new(SessionExistsGuard::new(Arc::clone(&engine)));
        let rate: Arc<dyn Guard> = Arc::new(RateLimitGuard::new(Arc::clone(&limiter)));

        Arc::new(Self {
            base_chain: GuardChain::new(vec![
                Arc::clone(&logger),
                Arc::clone(&api_key),
                Arc::clone(&name),
                Arc::clone(&rate),
            ]),
            scoped_chain: GuardChain::new(vec![logger, api_key, name, exists, rate]),
            config,
            engine,
            limiter,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
