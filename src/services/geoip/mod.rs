//! IP 地理位置解析
//!
//! 优先使用本地 GeoLite2-City 数据库，未配置或无法打开时改用外部 HTTP API。

mod external_api;
mod provider;

pub use provider::{GeoInfo, GeoIpLookup, GeoIpProvider};
