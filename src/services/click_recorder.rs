//! 点击记录：唯一性判定 → 元数据补全 → 写入点击 → 原子自增计数

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::enrichment::{ClickEnricher, RequestContext};
use crate::errors::Result;
use crate::storage::{ClickStore, LinkStore, NewClickEvent};

/// 单次记录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedClick {
    pub is_unique: bool,
    /// 计数器自增是否成功
    pub counted: bool,
}

#[derive(Clone)]
pub struct ClickRecorder {
    links: Arc<dyn LinkStore>,
    clicks: Arc<dyn ClickStore>,
    enricher: ClickEnricher,
}

impl ClickRecorder {
    pub fn new(
        links: Arc<dyn LinkStore>,
        clicks: Arc<dyn ClickStore>,
        enricher: ClickEnricher,
    ) -> Self {
        Self {
            links,
            clicks,
            enricher,
        }
    }

    /// 同一 (ip, user_agent) 首次访问该链接即为唯一访客；查询失败按唯一处理
    async fn is_unique(&self, link_id: &str, ctx: &RequestContext) -> bool {
        match self
            .clicks
            .has_prior_click(
                link_id,
                ctx.ip_address.as_deref(),
                ctx.user_agent.as_deref(),
            )
            .await
        {
            Ok(seen) => !seen,
            Err(e) => {
                warn!("Uniqueness lookup failed for {}: {}", link_id, e);
                true
            }
        }
    }

    /// 记录一次点击
    ///
    /// 只有写入点击失败时返回错误；计数器自增失败只记录日志，已写入的点击不回滚。
    pub async fn record(&self, link_id: &str, ctx: &RequestContext) -> Result<RecordedClick> {
        let is_unique = self.is_unique(link_id, ctx).await;
        let enrichment = self.enricher.enrich(ctx).await;

        let click = NewClickEvent {
            link_id: link_id.to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            referrer: ctx.referrer.clone(),
            country: enrichment.geo.country,
            city: enrichment.geo.city,
            device_type: enrichment.agent.device_type,
            browser: enrichment.agent.browser,
            operating_system: enrichment.agent.operating_system,
            is_unique,
            clicked_at: Utc::now(),
        };
        self.clicks.insert_click(click).await?;

        let counted = match self.links.increment_clicks(link_id, is_unique).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to increment counters for {}: {}", link_id, e);
                false
            }
        };

        debug!("Click recorded for {} (unique: {})", link_id, is_unique);
        Ok(RecordedClick { is_unique, counted })
    }
}
