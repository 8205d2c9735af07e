//! Server mode

use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpServer, web};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{AppState, Collaborators, RateLimiters, build_app};
use crate::config::StaticConfig;
use crate::services::{GeoIpProvider, IdentityVerifier, JwtIdentityVerifier};
use crate::storage::SeaOrmStorage;

/// 连接存储并装配所有服务
pub async fn prepare_state(config: &StaticConfig) -> Result<(AppState, Arc<SeaOrmStorage>)> {
    let start = std::time::Instant::now();

    let storage = Arc::new(
        SeaOrmStorage::connect(&config.database)
            .await
            .context("Failed to initialize storage")?,
    );
    info!("Using storage backend: {}", storage.backend_name());

    let identity: Arc<dyn IdentityVerifier> =
        Arc::new(JwtIdentityVerifier::from_config(&config.auth));

    let state = AppState::new(
        Collaborators {
            links: storage.clone(),
            clicks: storage.clone(),
            security_logs: storage.clone(),
            geoip: GeoIpProvider::new(&config.analytics),
            identity,
        },
        config,
    );

    info!("Startup preparation finished in {:?}", start.elapsed());
    Ok((state, storage))
}

/// 运行 HTTP 服务器直到收到退出信号
///
/// 调用前需要完成日志初始化
pub async fn run_server(config: Arc<StaticConfig>) -> Result<()> {
    let (state, storage) = prepare_state(&config).await?;

    if !state.ip_resolver.has_trusted_proxies() {
        warn!(
            "No trusted proxies configured: connections from private IPs will use X-Forwarded-For"
        );
    } else {
        info!("Trusted proxies: {:?}", config.server.trusted_proxies);
    }

    let limiters = RateLimiters::from_config(&config.rate_limit, state.ip_resolver.clone())
        .context("Invalid rate limit configuration")?;
    let state = web::Data::new(state);
    let cors_origins = config.server.cors_allowed_origins.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Using {} CPU cores for the server", cpu_count);
    warn!("Starting server at http://{}", bind_address);

    HttpServer::new(move || build_app(state.clone(), limiters.clone(), cors_origins.clone()))
        .keep_alive(Duration::from_secs(30))
        .client_request_timeout(Duration::from_millis(5000))
        .workers(cpu_count)
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await
        .context("HTTP server terminated with an error")?;

    info!("Server stopped, closing database connections");
    if let Err(e) = storage.get_db().clone().close().await {
        warn!("Failed to close database cleanly: {}", e);
    }
    Ok(())
}
