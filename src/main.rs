use clap::Parser;
use std::path::PathBuf;

/// Fanout Chat - ask several AI models at once and get one combined answer
#[derive(Parser, Debug)]
#[command(name = "fanout-chat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to bind the server to (overrides the config file)
    #[arg(long, env = "FANOUT_CHAT_PORT")]
    port: Option<u16>,

    /// Address to bind the server to (overrides the config file)
    #[arg(long, env = "FANOUT_CHAT_BIND")]
    bind: Option<String>,

    /// Config file path (default: ~/.fanout-chat/config.toml)
    #[arg(long, env = "FANOUT_CHAT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger, defaulting to info when RUST_LOG is unset
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    use fanout_chat_lib::config::{AppConfig, SecretsConfig};
    use fanout_chat_lib::council::{Council, JobStore};
    use fanout_chat_lib::events::EventBroadcaster;
    use fanout_chat_lib::gateway::HttpGateway;
    use fanout_chat_lib::server::{self, ServerAppState};
    use fanout_chat_lib::shutdown::{register_signal_handlers, ShutdownState};
    use std::sync::Arc;
    use std::time::Duration;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let secrets = SecretsConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load secrets, continuing without stored tokens: {}", e);
        SecretsConfig::default()
    });

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let shutdown_state = ShutdownState::new();
        if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
            log::warn!("Failed to register signal handlers: {}", e);
        }

        let gateway = Arc::new(HttpGateway::new(config.effective_providers(), &secrets));
        let broadcaster = Arc::new(EventBroadcaster::new());
        let council = Council::new(gateway, config.generation.clone(), broadcaster.clone());

        JobStore::start_cleanup_task(
            council.job_store(),
            Duration::from_secs(config.jobs.cleanup_interval_secs.max(1)),
            Duration::from_secs(config.jobs.retention_secs),
        );

        let port = config.server.port;
        let bind = config.server.bind.clone();
        let state = ServerAppState::new(council, config, broadcaster, shutdown_state);

        server::run_server(port, &bind, state)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    })
}
