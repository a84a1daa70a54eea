use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bpsr_crowd_data::cli::{Cli, Commands};
use bpsr_crowd_data::models::ApiKey;
use bpsr_crowd_data::{db, init_store, routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bpsr_crowd_data=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }

    match cli.command() {
        Commands::Serve => serve(config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::SeedKey { key, label } => seed_key(&config, &key, &label).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting BPSR Crowd Data server...");
    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    let store = init_store(&config).await?;

    let state = AppState::new(store, config.clone());
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let store = db::connect(&config.database_url).await?;
    store.migrate().await?;
    println!("Migrations applied ({})", store.dialect());
    Ok(())
}

async fn seed_key(config: &Config, key: &str, label: &str) -> anyhow::Result<()> {
    if !ApiKey::validate_format(key) {
        anyhow::bail!("API key must be 8 to 256 characters with no whitespace");
    }

    let store = db::connect(&config.database_url).await?;
    store.migrate().await?;

    if store.seed_api_key(key, Some(label)).await? {
        println!("SUCCESS: API key seeded with label '{}'", label);
    } else {
        println!("API key already present, nothing to do");
    }
    println!("  Key preview: {}", ApiKey::preview(key));

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
