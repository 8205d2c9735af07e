//! 集成测试共用的环境搭建
#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use tempfile::TempDir;

use linktracker::api::{AppState, Collaborators, RateLimiters};
use linktracker::config::{DatabaseConfig, RateLimitConfig, StaticConfig};
use linktracker::services::{GeoIpProvider, IdentityVerifier, JwtIdentityVerifier, RequestContext};
use linktracker::storage::SeaOrmStorage;
use linktracker::utils::ip::ClientIpResolver;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const OWNER: &str = "user-owner";
pub const OTHER_USER: &str = "user-other";

/// 临时 SQLite 数据库；TempDir 需要与存储同生命周期
pub struct TestDb {
    pub storage: Arc<SeaOrmStorage>,
    _dir: TempDir,
}

pub async fn temp_storage() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("linktracker_test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let storage = SeaOrmStorage::connect(&config)
        .await
        .expect("Failed to create storage");

    TestDb {
        storage: Arc::new(storage),
        _dir: dir,
    }
}

pub fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.server.public_base_url = Some("https://t.example.com".to_string());
    // 测试中不触发限流
    config.rate_limit = RateLimitConfig {
        api_period_ms: 1,
        api_burst: 10_000,
        redirect_period_ms: 1,
        redirect_burst: 10_000,
    };
    config
}

pub fn test_state(storage: Arc<SeaOrmStorage>, config: &StaticConfig) -> AppState {
    let identity: Arc<dyn IdentityVerifier> =
        Arc::new(JwtIdentityVerifier::new(TEST_SECRET, None, None));

    AppState::new(
        Collaborators {
            links: storage.clone(),
            clicks: storage.clone(),
            security_logs: storage,
            geoip: GeoIpProvider::disabled(),
            identity,
        },
        config,
    )
}

pub fn test_limiters(config: &StaticConfig) -> RateLimiters {
    RateLimiters::from_config(&config.rate_limit, ClientIpResolver::default())
        .expect("Failed to build rate limiters")
}

pub fn app_data(storage: Arc<SeaOrmStorage>) -> (web::Data<AppState>, RateLimiters) {
    let config = test_config();
    (
        web::Data::new(test_state(storage, &config)),
        test_limiters(&config),
    )
}

pub fn bearer(user_id: &str) -> String {
    let token = JwtIdentityVerifier::new(TEST_SECRET, None, None)
        .issue_token(user_id, Some("owner@example.com"), 60)
        .expect("Failed to issue token");
    format!("Bearer {}", token)
}

pub fn visitor(ip: &str, user_agent: &str) -> RequestContext {
    RequestContext {
        ip_address: Some(ip.to_string()),
        user_agent: Some(user_agent.to_string()),
        referrer: None,
    }
}

pub const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
