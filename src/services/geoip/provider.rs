//! 点击的国家 / 城市解析
//!
//! 根据配置选择实现：
//! 1. 关闭地理解析 → 始终返回 None
//! 2. maxminddb_path 可读 → 本地 GeoLite2-City 数据库
//! 3. 否则 → ExternalApiProvider

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::{MaxMindDbError, Reader, geoip2};
use tracing::{debug, info, trace, warn};

use super::external_api::ExternalApiProvider;
use crate::config::AnalyticsConfig;
use crate::utils::ip::is_private_or_local;

/// 写入点击记录的地理位置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    /// ISO 3166-1 alpha-2，大写
    pub country: Option<String>,
    pub city: Option<String>,
}

impl GeoInfo {
    /// 去掉空白字段；两个字段都为空时视为没有结果
    pub fn from_parts(country: Option<&str>, city: Option<&str>) -> Option<Self> {
        let country = country
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase);
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        if country.is_none() && city.is_none() {
            return None;
        }
        Some(Self { country, city })
    }
}

/// IP → 地理位置；查不到时返回 None，不返回错误
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoInfo>;

    /// provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

struct DisabledLookup;

#[async_trait]
impl GeoIpLookup for DisabledLookup {
    async fn lookup(&self, _ip: IpAddr) -> Option<GeoInfo> {
        None
    }

    fn name(&self) -> &'static str {
        "Disabled"
    }
}

/// 本地 GeoLite2-City 数据库，整个文件读入内存
struct CityDatabase {
    reader: Reader<Vec<u8>>,
}

impl CityDatabase {
    fn open(path: &str) -> Result<Self, MaxMindDbError> {
        Ok(Self {
            reader: Reader::open_readfile(path)?,
        })
    }

    fn resolve(&self, ip: IpAddr) -> Result<Option<GeoInfo>, MaxMindDbError> {
        let Some(record) = self.reader.lookup(ip)?.decode::<geoip2::City>()? else {
            return Ok(None);
        };
        Ok(GeoInfo::from_parts(
            record.country.iso_code,
            record.city.names.english,
        ))
    }
}

#[async_trait]
impl GeoIpLookup for CityDatabase {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoInfo> {
        match self.resolve(ip) {
            Ok(geo) => {
                trace!("GeoLite2 {} → {:?}", ip, geo);
                geo
            }
            Err(e) => {
                debug!("GeoLite2 lookup for {} failed: {}", ip, e);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "GeoLite2"
    }
}

#[derive(Clone)]
pub struct GeoIpProvider {
    inner: Arc<dyn GeoIpLookup>,
}

impl GeoIpProvider {
    pub fn new(config: &AnalyticsConfig) -> Self {
        if !config.enable_geo_lookup {
            info!("GeoIP: lookups disabled");
            return Self::disabled();
        }

        let inner: Arc<dyn GeoIpLookup> = match config.maxminddb_path.as_deref() {
            Some(path) => match CityDatabase::open(path) {
                Ok(db) => {
                    info!("GeoIP: Using GeoLite2 database at {}", path);
                    Arc::new(db)
                }
                Err(e) => {
                    warn!(
                        "GeoIP: Failed to open {}: {}, falling back to external API",
                        path, e
                    );
                    Arc::new(ExternalApiProvider::new(&config.geoip_api_url))
                }
            },
            None => {
                debug!("GeoIP: No MaxMind database configured, using external API");
                Arc::new(ExternalApiProvider::new(&config.geoip_api_url))
            }
        };

        info!("GeoIP: Initialized with {} provider", inner.name());
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(DisabledLookup),
        }
    }

    pub fn from_lookup(inner: Arc<dyn GeoIpLookup>) -> Self {
        Self { inner }
    }

    /// 私有/本地地址和无法解析的输入直接返回 None
    pub async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let addr: IpAddr = ip.parse().ok()?;
        if is_private_or_local(&addr) {
            return None;
        }
        self.inner.lookup(addr).await
    }

    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
