use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use icon_engine::{
    CacheStore, CdnConfig, CdnPurger, DurableStore, EngineConfig, FileStore, HttpFetcher,
    IconEngine, MemoryStore, PurgeCoordinator, ResolverConfig, create_client,
};

mod cli;
mod routes;

use cli::CliArgs;
use routes::AppState;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let resolver = match &args.resolver_config {
        Some(path) => ResolverConfig::from_json_file(path)?,
        None => ResolverConfig::default(),
    };

    let config = EngineConfig {
        assets_root: args.assets_root.clone(),
        resolver,
        cdn: match (&args.cdn_endpoint, &args.cdn_token) {
            (Some(endpoint), Some(token)) => Some(CdnConfig {
                endpoint: endpoint.clone(),
                token: token.clone(),
            }),
            _ => None,
        },
        ..EngineConfig::default()
    };

    let client = create_client(&config)?;
    let fetcher = Arc::new(HttpFetcher::new(client.clone(), config.max_origin_bytes));

    let cache = CacheStore::new(Arc::new(MemoryStore::new(args.cache_mb.max(1) * 1024 * 1024)));
    let durable = DurableStore::new(Arc::new(FileStore::new(args.store_dir.clone())));

    let purger = PurgeCoordinator::new(
        cache.clone(),
        durable.clone(),
        config
            .cdn
            .clone()
            .map(|cdn| CdnPurger::new(client.clone(), cdn)),
    );
    let engine = IconEngine::new(config, cache, durable, fetcher);

    if args.admin_token.is_none() {
        info!("no admin credential configured; purge and prefetch endpoints are disabled");
    }

    let state = AppState {
        engine,
        purger: Arc::new(purger),
        admin_token: args.admin_token.clone(),
    };

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(addr = %listener.local_addr()?, assets = %args.assets_root.display(), "listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install shutdown handler");
        return;
    }
    info!("shutdown signal received");
}
