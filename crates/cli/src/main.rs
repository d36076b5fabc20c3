use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use chatwire_config::ChatwireConfig;

#[derive(Parser)]
#[command(name = "chatwire", about = "Chatwire — chat-session HTTP gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Bind address override.
        #[arg(long)]
        bind: Option<String>,
        /// Port override.
        #[arg(long)]
        port: Option<u16>,
        /// Explicit config file (skips discovery).
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration (api key masked).
    Show,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> anyhow::Result<ChatwireConfig> {
    match path {
        Some(path) => chatwire_config::load_config(path),
        None => Ok(chatwire_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatwire starting");

    match cli.command {
        Commands::Serve { bind, port, config } => {
            let mut config = resolve_config(config.as_deref())?;
            if let Some(bind) = bind {
                config.gateway.bind = bind;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            chatwire_gateway::server::start_gateway(config).await
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let mut config = chatwire_config::discover_and_load();
                if let Some(key) = config.gateway.api_key.as_mut() {
                    *key = "********".into();
                }
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            },
        },
    }
}
