use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_gateway::{
    aggregation::{AggregationEngine, LoadOptions},
    auth::{Authenticator, MemoryUserStore},
    config::Config,
    models::PlaylistConfig,
    proxy::M3uGenerator,
    security::{AccessPolicy, PolicyHandle},
    services::{CatalogRefresher, CatalogStore},
    sources::{ProviderContext, ProviderRegistry},
    utils::HttpClientFactory,
    web::{build_router, AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "m3u-gateway")]
#[command(version)]
#[command(about = "Merges IPTV playlists from several providers and serves them behind an access gateway")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the merged playlist (default)
    Serve {
        /// Listening IP address
        #[arg(short = 'H', long, value_name = "IP")]
        host: Option<String>,

        /// Listening port
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
    /// Load the playlist once and write it as M3U
    Generate {
        /// Output file, stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Validate the configuration, playlist document and security policy
    CheckConfig,
    /// Print a bcrypt hash for an `[[auth.users]]` entry
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("m3u_gateway={},tower_http=trace", cli.log_level)
    } else {
        format!("m3u_gateway={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(&cli.config, host, port).await,
        Command::Generate { output } => generate(&cli.config, output).await,
        Command::CheckConfig => check_config(&cli.config).await,
        Command::HashPassword { password } => {
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
            println!("{hash}");
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> Result<AggregationEngine> {
    let http_client = HttpClientFactory::new(
        config.playlist.connect_timeout,
        config.playlist.fetch_timeout,
    )
    .build()?;
    let registry = Arc::new(ProviderRegistry::with_builtin());
    info!("Registered provider kinds: {:?}", registry.supported_kinds());

    Ok(AggregationEngine::new(
        registry,
        ProviderContext::new(http_client),
        LoadOptions {
            fetch_timeout: config.playlist.fetch_timeout,
            max_concurrent_fetches: config.playlist.max_concurrent_fetches,
        },
    ))
}

fn build_policy(config: &Config) -> Result<AccessPolicy> {
    Ok(match config.load_security()? {
        Some(security) => AccessPolicy::from_config(&security)?,
        None => AccessPolicy::permissive(),
    })
}

fn build_authenticator(config: &Config) -> Option<Authenticator> {
    config.auth.as_ref().map(|auth| {
        let store = MemoryUserStore::from_hashes(
            auth.users
                .iter()
                .map(|u| (u.username.clone(), u.password_hash.clone())),
        );
        Authenticator::new(Arc::new(store), auth.api_tokens.iter().cloned())
    })
}

async fn serve(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    info!("Starting M3U Gateway v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(config_path)?;
    info!("Configuration loaded from: {}", config_path.display());

    // Override config with CLI arguments
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.bind_address()))?;

    let policy = build_policy(&config)?;
    let cors = policy.cors().clone();
    let policy = PolicyHandle::new(policy);
    let auth = build_authenticator(&config);
    if auth.is_none() {
        warn!("No [auth] section configured, playlist routes are unauthenticated");
    }

    let cancellation_token = CancellationToken::new();
    let catalog = Arc::new(CatalogStore::new());
    let refresher = CatalogRefresher::new(
        Arc::new(build_engine(&config)?),
        catalog.clone(),
        config.playlist.config_path.clone(),
        config.playlist.refresh_interval,
        cancellation_token.child_token(),
    );
    let refresher_handle = refresher.spawn();

    spawn_policy_reload(config.clone(), policy.clone(), cancellation_token.clone());

    let app = build_router(AppState::new(catalog, policy, auth), &cors)?;
    let web_server = WebServer::new(addr, app);
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    web_server
        .serve_with_cancellation(cancellation_token.clone())
        .await?;

    cancellation_token.cancel();
    if let Err(e) = refresher_handle.await {
        error!("Catalog refresher task failed: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}

/// Rebuild the access policy on SIGHUP and swap it in whole
#[cfg(unix)]
fn spawn_policy_reload(config: Config, policy: PolicyHandle, cancel: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("Policy reload on SIGHUP unavailable: {}", e);
                return;
            }
        };
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    match build_policy(&config) {
                        Ok(next) => {
                            policy.replace(next).await;
                            info!("Access policy reloaded");
                        }
                        Err(e) => error!("Access policy reload failed, keeping current policy: {}", e),
                    }
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_policy_reload(_config: Config, _policy: PolicyHandle, _cancel: CancellationToken) {}

async fn generate(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load_from_file(config_path)?;
    let engine = build_engine(&config)?;
    let playlist = engine.load_from_file(&config.playlist.config_path).await?;
    let generator = M3uGenerator::new();

    let written = match output {
        Some(path) => {
            let mut file = std::fs::File::create(&path)
                .with_context(|| format!("Unable to create {}", path.display()))?;
            let written = generator.write_to(&playlist, &mut file)?;
            info!("Wrote {} entries to {}", playlist.stream_count(), path.display());
            written
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            generator.write_to(&playlist, &mut lock)?
        }
    };
    info!("Generated playlist, {} bytes", written);
    Ok(())
}

async fn check_config(config_path: &Path) -> Result<()> {
    let config = Config::load_from_file(config_path)?;
    info!("Configuration OK: {}", config_path.display());

    let playlist_config = PlaylistConfig::load_from_file(&config.playlist.config_path)?;
    let priority = playlist_config.resolve_priority()?;
    let registry = ProviderRegistry::with_builtin();
    for name in &priority {
        let provider = playlist_config
            .providers
            .get(name)
            .with_context(|| format!("providers_priority names unknown provider '{name}'"))?;
        if !registry.is_supported(&provider.provider) {
            anyhow::bail!(
                "Provider '{}' has unsupported kind '{}'",
                name,
                provider.provider
            );
        }
    }
    info!(
        "Playlist document OK: {} providers, {} overrides",
        priority.len(),
        playlist_config.overrides.len()
    );

    let policy = build_policy(&config)?;
    info!("Security policy OK: {:?}", policy);
    Ok(())
}
