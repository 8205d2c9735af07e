//! 请求处理共享的应用状态

use std::sync::Arc;
use std::time::Instant;

use actix_web::HttpRequest;

use crate::config::{Environment, StaticConfig};
use crate::services::{
    AnalyticsService, ClickEnricher, ClickRecorder, GeoIpProvider, IdentityVerifier, LinkService,
    RequestContext, SecurityLogService,
};
use crate::storage::{ClickStore, LinkStore, SecurityLogStore};
use crate::utils::ip::ClientIpResolver;

#[derive(Clone)]
pub struct AppState {
    pub links: Arc<dyn LinkStore>,
    pub link_service: LinkService,
    pub analytics: AnalyticsService,
    pub recorder: ClickRecorder,
    pub security: SecurityLogService,
    pub identity: Arc<dyn IdentityVerifier>,
    pub ip_resolver: ClientIpResolver,
    pub public_base_url: Option<String>,
    pub environment: Environment,
    pub started_at: Instant,
}

/// 存储与外部协作方
pub struct Collaborators {
    pub links: Arc<dyn LinkStore>,
    pub clicks: Arc<dyn ClickStore>,
    pub security_logs: Arc<dyn SecurityLogStore>,
    pub geoip: GeoIpProvider,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(deps: Collaborators, config: &StaticConfig) -> Self {
        let security = SecurityLogService::new(deps.security_logs);
        let recorder = ClickRecorder::new(
            deps.links.clone(),
            deps.clicks.clone(),
            ClickEnricher::new(deps.geoip),
        );

        Self {
            link_service: LinkService::new(
                deps.links.clone(),
                security.clone(),
                config.links.id_length,
            ),
            analytics: AnalyticsService::new(deps.links.clone(), deps.clicks),
            recorder,
            security,
            identity: deps.identity,
            links: deps.links,
            ip_resolver: ClientIpResolver::new(&config.server.trusted_proxies),
            public_base_url: config
                .server
                .public_base_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            environment: config.server.environment,
            started_at: Instant::now(),
        }
    }

    pub fn request_context(&self, req: &HttpRequest) -> RequestContext {
        RequestContext::from_request(req, &self.ip_resolver)
    }

    /// 生成 trackable_url 的前缀：优先使用配置，否则按请求推导
    pub fn base_url(&self, req: &HttpRequest) -> String {
        match &self.public_base_url {
            Some(url) => url.clone(),
            None => {
                let conn = req.connection_info();
                format!("{}://{}", conn.scheme(), conn.host())
            }
        }
    }
}
