use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use imagepress::config::Config;
use imagepress::delivery::{ConcurrencyLimiter, ImageService, ResultCache};
use imagepress::server::{create_router, RouterConfig};
use imagepress::store::{create_s3_client, S3BlobStore};

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "imagepress=debug,tower_http=debug"
    } else {
        "imagepress=info,tower_http=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(message) = config.validate() {
        error!("invalid configuration: {message}");
        return ExitCode::FAILURE;
    }

    info!(
        bucket = %config.s3_bucket,
        region = %config.s3_region,
        endpoint = config.s3_endpoint.as_deref().unwrap_or("aws"),
        "connecting to object storage"
    );

    let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let store = S3BlobStore::new(client, config.s3_bucket.clone());

    // Fail fast on unreachable or misconfigured storage instead of
    // surfacing it on the first request.
    if let Err(e) = store.check_access().await {
        error!(
            error = %e,
            "cannot access bucket {:?}; check credentials, region and endpoint",
            config.s3_bucket
        );
        return ExitCode::FAILURE;
    }

    let cache = Arc::new(ResultCache::new(config.cache_bytes));
    let limiter = Arc::new(ConcurrencyLimiter::resolve(config.max_concurrency));
    info!(
        cache_enabled = config.cache_enabled(),
        cache_bytes = config.cache_bytes,
        concurrency = limiter.limit(),
        "delivery service initialized"
    );

    let service = ImageService::new(Arc::new(store), cache, limiter, config.max_upload_size);

    let router = create_router(
        service,
        RouterConfig {
            cors_origins: config.cors_origins.clone(),
            cache_max_age: config.cache_max_age,
            enable_tracing: !config.no_tracing,
            max_upload_size: config.max_upload_size,
        },
    );

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind {addr}");
            return ExitCode::FAILURE;
        }
    };

    info!("listening on http://{addr}");
    if let Err(e) = axum::serve(listener, router).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
