//! Configuration: schema, file discovery, `${ENV}` substitution.
//!
//! Config files are `chatwire.{toml,yaml,yml,json}`, looked up
//! project-local first, then under `~/.config/chatwire/`. The resolved
//! [`ChatwireConfig`] is built once at process start; nothing in the
//! workspace reads configuration ambiently after that.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    env_subst::substitute_env,
    loader::{clear_config_dir, discover_and_load, load_config, set_config_dir},
    schema::{ChatwireConfig, GatePolicy, GatewayConfig, RateLimitConfig, WebhookConfig},
};
