//! 请求上下文提取与点击元数据补全

use std::sync::Arc;

use actix_web::HttpRequest;
use actix_web::http::header;

use super::geoip::{GeoInfo, GeoIpProvider};
use super::user_agent::{UserAgentInfo, UserAgentParser, WootheeParser, describe_user_agent};
use crate::utils::ip::ClientIpResolver;

/// 从入站请求中提取的原始元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

fn header_string(req: &HttpRequest, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl RequestContext {
    pub fn from_request(req: &HttpRequest, ip_resolver: &ClientIpResolver) -> Self {
        Self {
            ip_address: ip_resolver.client_ip(req),
            user_agent: header_string(req, header::USER_AGENT),
            referrer: header_string(req, header::REFERER),
        }
    }
}

/// 补全后的点击元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub geo: GeoInfo,
    pub agent: UserAgentInfo,
}

/// 组合 GeoIP 与 UA 解析；两者失败时对应字段为空，不返回错误
#[derive(Clone)]
pub struct ClickEnricher {
    geoip: GeoIpProvider,
    parser: Arc<dyn UserAgentParser>,
}

impl ClickEnricher {
    pub fn new(geoip: GeoIpProvider) -> Self {
        Self::with_parser(geoip, Arc::new(WootheeParser::new()))
    }

    pub fn with_parser(geoip: GeoIpProvider, parser: Arc<dyn UserAgentParser>) -> Self {
        Self { geoip, parser }
    }

    pub async fn enrich(&self, ctx: &RequestContext) -> Enrichment {
        let geo = match ctx.ip_address.as_deref() {
            Some(ip) => self.geoip.lookup(ip).await.unwrap_or_default(),
            None => GeoInfo::default(),
        };
        let agent = describe_user_agent(self.parser.as_ref(), ctx.user_agent.as_deref());

        Enrichment { geo, agent }
    }
}
