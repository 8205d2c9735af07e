//! 基于客户端 IP 的限流（actix-governor 令牌桶）

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpResponse, HttpResponseBuilder};
use governor::NotUntil;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use serde_json::json;
use tracing::{debug, info};

use crate::config::RateLimitConfig;
use crate::errors::{LinkTrackerError, Result};
use crate::utils::ip::ClientIpResolver;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later";

pub type IpGovernor = Governor<ClientIpKeyExtractor, NoOpMiddleware>;

/// 克隆后共享同一个令牌桶状态
pub type IpGovernorConfig = GovernorConfig<ClientIpKeyExtractor, NoOpMiddleware>;

/// 限流 key：与点击记录使用同一套客户端 IP 解析规则
#[derive(Clone)]
pub struct ClientIpKeyExtractor {
    resolver: ClientIpResolver,
}

impl ClientIpKeyExtractor {
    pub fn new(resolver: ClientIpResolver) -> Self {
        Self { resolver }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        let key = self
            .resolver
            .resolve_connection(&req.connection_info(), req.headers())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(key)
    }

    fn exceed_rate_limit_response(
        &self,
        _negative: &NotUntil<QuantaInstant>,
        mut response: HttpResponseBuilder,
    ) -> HttpResponse {
        info!("Rate limit exceeded");
        response.json(json!({
            "success": false,
            "error": RATE_LIMIT_MESSAGE,
        }))
    }
}

/// API 与跳转端点各自独立的限流器
///
/// 每个 worker 通过 `Governor::new` 包装同一份配置，令牌桶在 worker 之间共享
#[derive(Clone)]
pub struct RateLimiters {
    pub api: IpGovernorConfig,
    pub redirect: IpGovernorConfig,
}

fn build_governor_config(
    period_ms: u64,
    burst: u32,
    extractor: ClientIpKeyExtractor,
) -> Result<IpGovernorConfig> {
    let config = GovernorConfigBuilder::default()
        .milliseconds_per_request(period_ms.max(1))
        .burst_size(burst.max(1))
        .key_extractor(extractor)
        .finish()
        .ok_or_else(|| {
            LinkTrackerError::invalid_field("rate_limit", format!(
                "Invalid rate limit config: {}ms per request, burst {}",
                period_ms, burst
            ))
        })?;
    Ok(config)
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig, resolver: ClientIpResolver) -> Result<Self> {
        let extractor = ClientIpKeyExtractor::new(resolver);
        debug!(
            "Rate limits: api {}ms/burst {}, redirect {}ms/burst {}",
            config.api_period_ms, config.api_burst, config.redirect_period_ms, config.redirect_burst
        );

        Ok(Self {
            api: build_governor_config(config.api_period_ms, config.api_burst, extractor.clone())?,
            redirect: build_governor_config(
                config.redirect_period_ms,
                config.redirect_burst,
                extractor,
            )?,
        })
    }

    pub fn api_governor(&self) -> IpGovernor {
        Governor::new(&self.api)
    }

    pub fn redirect_governor(&self) -> IpGovernor {
        Governor::new(&self.redirect)
    }
}
