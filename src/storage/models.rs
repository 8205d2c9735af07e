use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UTM 参数集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl UtmParams {
    /// 按固定顺序返回 (参数名, 值)，跳过未设置和空字符串
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("utm_source", &self.utm_source),
            ("utm_medium", &self.utm_medium),
            ("utm_campaign", &self.utm_campaign),
            ("utm_term", &self.utm_term),
            ("utm_content", &self.utm_content),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLink {
    pub id: String,
    /// 已合并 UTM 参数的最终跳转地址
    pub original_url: String,
    pub owner_id: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password_hash: Option<String>,
    pub utm: UtmParams,
    pub campaign_name: Option<String>,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedLink {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    pub fn click_cap_reached(&self) -> bool {
        self.max_clicks.is_some_and(|max| self.total_clicks >= max)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// 新建链接（计数器由存储层初始化为 0）
#[derive(Debug, Clone)]
pub struct NewTrackedLink {
    pub id: String,
    pub original_url: String,
    pub owner_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password_hash: Option<String>,
    pub utm: UtmParams,
    pub campaign_name: Option<String>,
}

/// 部分更新
///
/// 外层 `None` 表示不修改该列；`Some(None)` 表示清空。
/// 计数器不在此列，只能通过 `LinkStore::increment_clicks` 修改。
#[derive(Debug, Clone, Default)]
pub struct LinkUpdate {
    pub original_url: Option<String>,
    pub campaign_name: Option<Option<String>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub max_clicks: Option<Option<i64>>,
    pub password_hash: Option<Option<String>>,
    pub utm: Option<UtmParams>,
    pub is_active: Option<bool>,
}

/// 聚合所需的链接摘要（持久化计数器）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub id: String,
    pub original_url: String,
    pub campaign_name: Option<String>,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub is_active: bool,
}

impl From<&TrackedLink> for LinkSummary {
    fn from(link: &TrackedLink) -> Self {
        Self {
            id: link.id.clone(),
            original_url: link.original_url.clone(),
            campaign_name: link.campaign_name.clone(),
            total_clicks: link.total_clicks,
            unique_clicks: link.unique_clicks,
            is_active: link.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub is_unique: bool,
    pub clicked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClickEvent {
    pub link_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub is_unique: bool,
    pub clicked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityLogEntry {
    pub id: i64,
    pub user_id: Option<String>,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSecurityLogEntry {
    pub user_id: Option<String>,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
