//! 数据访问接口
//!
//! 服务层只依赖这里的 trait，`SeaOrmStorage` 是唯一的生产实现，
//! 测试中可以替换为内存实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    ClickEvent, LinkSummary, LinkUpdate, NewClickEvent, NewSecurityLogEntry, NewTrackedLink,
    SecurityLogEntry, TrackedLink,
};
use crate::errors::Result;

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn insert_link(&self, link: NewTrackedLink) -> Result<TrackedLink>;

    async fn link_exists(&self, id: &str) -> Result<bool>;

    /// 只返回 `is_active = true` 的链接
    async fn find_active_link(&self, id: &str) -> Result<Option<TrackedLink>>;

    /// 按 owner 限定范围查询，不属于该 owner 的链接视为不存在
    async fn find_owned_link(&self, id: &str, owner_id: &str) -> Result<Option<TrackedLink>>;

    /// 按创建时间倒序
    async fn list_links(&self, owner_id: &str) -> Result<Vec<TrackedLink>>;

    async fn list_link_summaries(&self, owner_id: &str) -> Result<Vec<LinkSummary>>;

    async fn update_link(
        &self,
        id: &str,
        owner_id: &str,
        update: LinkUpdate,
    ) -> Result<Option<TrackedLink>>;

    /// 同时删除该链接的点击记录，返回是否删除成功
    async fn delete_link(&self, id: &str, owner_id: &str) -> Result<bool>;

    /// 原子自增：total_clicks += 1，unique 时 unique_clicks += 1
    async fn increment_clicks(&self, id: &str, unique: bool) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait ClickStore: Send + Sync {
    /// 是否已存在相同 (link_id, ip, user_agent) 的点击
    async fn has_prior_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<bool>;

    async fn insert_click(&self, click: NewClickEvent) -> Result<()>;

    /// `[since, until]` 闭区间，按 clicked_at 倒序；调用方保证 `link_ids` 非空
    async fn clicks_in_window(
        &self,
        link_ids: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClickEvent>>;
}

#[async_trait]
pub trait SecurityLogStore: Send + Sync {
    async fn append_security_log(&self, entry: NewSecurityLogEntry) -> Result<()>;

    /// 返回 (当前页, 总数)，按时间倒序
    async fn security_logs_page(
        &self,
        user_id: &str,
        action: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<SecurityLogEntry>, u64)>;

    /// 按时间倒序
    async fn security_logs_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SecurityLogEntry>>;
}
