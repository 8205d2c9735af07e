//! 访客 IP 解析
//!
//! 点击去重、地理解析和限流都用同一个访客 IP，规则集中在 [`ClientIpResolver`]：
//! 1. 配置了 trusted_proxies：只有来自这些地址的连接才读取转发头
//! 2. 未配置：来自私有/本地地址的连接视为反向代理，读取转发头
//! 3. 其余情况使用连接对端地址，防止公网客户端伪造转发头

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use actix_web::HttpRequest;
use actix_web::dev::ConnectionInfo;
use actix_web::http::header::HeaderMap;
use tracing::{debug, warn};

/// 私有、环回、IPv6 ULA 与链路本地地址
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local() || v6.is_unicast_link_local(),
    }
}

/// 单个地址或 `addr/prefix` 网段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyRule {
    Host(IpAddr),
    Network { base: IpAddr, prefix: u8 },
}

fn as_bits(ip: IpAddr) -> (u128, u8) {
    match ip {
        IpAddr::V4(v4) => (u32::from(v4) as u128, 32),
        IpAddr::V6(v6) => (u128::from(v6), 128),
    }
}

impl ProxyRule {
    fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let Some((base, prefix)) = entry.split_once('/') else {
            return entry.parse().ok().map(ProxyRule::Host);
        };

        let base: IpAddr = base.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        (prefix <= as_bits(base).1).then_some(ProxyRule::Network { base, prefix })
    }

    fn matches(&self, ip: IpAddr) -> bool {
        match *self {
            ProxyRule::Host(host) => host == ip,
            ProxyRule::Network { base, prefix } => {
                let (net_bits, width) = as_bits(base);
                let (ip_bits, ip_width) = as_bits(ip);
                if width != ip_width {
                    return false;
                }
                let shift = u32::from(width - prefix);
                prefix == 0 || (net_bits >> shift) == (ip_bits >> shift)
            }
        }
    }
}

/// `1.2.3.4`、`1.2.3.4:80`、`[::1]:80` 都接受
fn parse_peer(addr: &str) -> Option<IpAddr> {
    addr.parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| addr.parse::<IpAddr>())
        .ok()
}

/// X-Forwarded-For 的第一个地址（原始客户端），其次 X-Real-IP
pub fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let first_hop = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };
    first_hop("x-forwarded-for").or_else(|| first_hop("x-real-ip"))
}

#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    proxies: Arc<[ProxyRule]>,
}

impl ClientIpResolver {
    /// 无法解析的条目记录警告后忽略
    pub fn new(trusted_proxies: &[String]) -> Self {
        let proxies: Vec<ProxyRule> = trusted_proxies
            .iter()
            .filter_map(|entry| {
                let rule = ProxyRule::parse(entry);
                if rule.is_none() {
                    warn!("Ignoring invalid trusted proxy entry: {:?}", entry);
                }
                rule
            })
            .collect();

        Self {
            proxies: proxies.into(),
        }
    }

    pub fn has_trusted_proxies(&self) -> bool {
        !self.proxies.is_empty()
    }

    fn reads_forwarded_headers(&self, peer: IpAddr) -> bool {
        if self.has_trusted_proxies() {
            self.proxies.iter().any(|rule| rule.matches(peer))
        } else {
            is_private_or_local(&peer)
        }
    }

    /// `peer` 为连接对端（可能带端口）；`forwarded` 只在需要时调用
    pub fn resolve<F>(&self, peer: Option<&str>, forwarded: F) -> Option<String>
    where
        F: FnOnce() -> Option<String>,
    {
        let Some(peer) = peer else {
            return forwarded();
        };
        let Some(peer_ip) = parse_peer(peer) else {
            return Some(peer.to_string());
        };

        if self.reads_forwarded_headers(peer_ip)
            && let Some(client) = forwarded()
        {
            debug!("Forwarded by {}: client {}", peer_ip, client);
            return Some(client);
        }
        Some(peer_ip.to_string())
    }

    pub fn resolve_connection(&self, conn: &ConnectionInfo, headers: &HeaderMap) -> Option<String> {
        self.resolve(conn.peer_addr(), || forwarded_client(headers))
    }

    pub fn client_ip(&self, req: &HttpRequest) -> Option<String> {
        self.resolve_connection(&req.connection_info(), req.headers())
    }
}
