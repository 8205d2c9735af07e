//! HTTP 地理位置服务（默认 ip-api.com）
//!
//! ureq 是阻塞客户端，请求放在 `spawn_blocking` 中执行。
//! 结果（包括查不到）按 IP 缓存 15 分钟；同一 IP 的并发点击共用一次请求。

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoInfo, GeoIpLookup};

const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const CACHE_CAPACITY: u64 = 10_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// 依次尝试的国家代码字段
const COUNTRY_FIELDS: &[&str] = &["countryCode", "country_code", "country"];

pub struct ExternalApiProvider {
    /// `{ip}` 为占位符
    endpoint: String,
    agent: Agent,
    cache: Cache<IpAddr, Option<GeoInfo>>,
}

impl ExternalApiProvider {
    pub fn new(endpoint: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();

        Self {
            endpoint: endpoint.to_string(),
            agent,
            cache: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(CACHE_CAPACITY)
                .build(),
        }
    }

    fn url_for(&self, ip: IpAddr) -> String {
        self.endpoint.replace("{ip}", &ip.to_string())
    }

    async fn query(&self, ip: IpAddr) -> Option<GeoInfo> {
        let url = self.url_for(ip);
        let agent = self.agent.clone();

        let reply = tokio::task::spawn_blocking(move || -> Result<Value, String> {
            agent
                .get(&url)
                .call()
                .map_err(|e| format!("request to {} failed: {}", url, e))?
                .into_body()
                .read_json::<Value>()
                .map_err(|e| format!("invalid JSON from {}: {}", url, e))
        })
        .await;

        match reply {
            Ok(Ok(body)) => geo_from_reply(&body),
            Ok(Err(e)) => {
                warn!("GeoIP API {}", e);
                None
            }
            Err(e) => {
                warn!("GeoIP API task failed: {}", e);
                None
            }
        }
    }
}

/// `status = "fail"`（如私有网段）视为查不到
fn geo_from_reply(body: &Value) -> Option<GeoInfo> {
    if body["status"].as_str() == Some("fail") {
        trace!("GeoIP API refused: {:?}", body["message"].as_str());
        return None;
    }

    let country = COUNTRY_FIELDS
        .iter()
        .find_map(|field| body[*field].as_str().filter(|v| !v.trim().is_empty()));
    GeoInfo::from_parts(country, body["city"].as_str())
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoInfo> {
        self.cache
            .get_with(ip, async {
                trace!("GeoIP cache miss for {}", ip);
                self.query(ip).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}
