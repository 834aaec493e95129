//! img2color - Average color of remote images over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use img2color::{
    config::Config,
    create_shared_router,
    gateway::{CacheGateway, JsonlColorStore, MemoryColorCache, StoreGateway},
    ColorService, HttpImageFetcher, RouterConfig,
};

/// Longest wait for background store writes at shutdown.
const STORE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let referer_policy = match config.referer_policy() {
        Ok(policy) => policy,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("img2color v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!(
        "  Pipeline: target width {}px, fetch timeout {}s, request timeout {}s, body limit {} bytes",
        config.target_width,
        config.fetch_timeout_secs,
        config.request_timeout_secs,
        config.max_body_bytes
    );

    // Cache
    let cache = if config.cache_enabled {
        info!("  Cache: in-memory, {} entries", config.cache_capacity);
        CacheGateway::new(Arc::new(MemoryColorCache::with_capacity(
            config.cache_capacity,
        )))
    } else {
        info!("  Cache: disabled");
        CacheGateway::disabled()
    };

    // Store
    let store = if config.store_enabled {
        match JsonlColorStore::open(&config.store_path) {
            Ok(store) => {
                info!("  Store: JSON Lines at {}", config.store_path.display());
                StoreGateway::new(Arc::new(store))
            }
            Err(e) if config.store_required => {
                error!("  Store: {}", e);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                warn!("  Store: {} - continuing without persistence", e);
                StoreGateway::disabled()
            }
        }
    } else {
        info!("  Store: disabled");
        StoreGateway::disabled()
    };

    // Referers
    if referer_policy.allows_all() {
        info!("  Referers: any");
    } else {
        info!("  Referers: {}", referer_policy.patterns().join(", "));
    }

    // Fetcher and service
    let fetcher = match HttpImageFetcher::with_options(
        &config.user_agent,
        config.fetch_timeout(),
        config.max_body_bytes,
    ) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = Arc::new(
        ColorService::new(fetcher)
            .with_cache(cache)
            .with_store(store)
            .with_target_width(config.target_width)
            .with_request_timeout(config.request_timeout()),
    );

    let router_config = RouterConfig::new()
        .with_referer_policy(referer_policy)
        .with_tracing(!config.no_tracing);

    let router = create_shared_router(service.clone(), router_config);

    // Bind and serve
    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl 'http://{}/api?img=<image-url>'", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let pending = service.pending_writes();
    if pending > 0 {
        info!("Waiting for {} pending store writes", pending);
    }
    if tokio::time::timeout(STORE_DRAIN_TIMEOUT, service.wait_for_background_writes())
        .await
        .is_err()
    {
        warn!(
            "Gave up on {} store writes after {}s",
            service.pending_writes(),
            STORE_DRAIN_TIMEOUT.as_secs()
        );
    }

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "img2color=debug,tower_http=debug"
    } else {
        "img2color=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
