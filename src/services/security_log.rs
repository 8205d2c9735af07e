//! 安全审计日志

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, EnumString};
use tracing::{debug, warn};

use super::enrichment::RequestContext;
use crate::errors::Result;
use crate::storage::{NewSecurityLogEntry, SecurityLogEntry, SecurityLogStore};

pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 100;
const OVERVIEW_DAYS: i64 = 30;
const OVERVIEW_RECENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityAction {
    LinkCreated,
    LinkUpdated,
    LinkDeleted,
    LinkPasswordFailed,
    AuthFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityLogPage {
    pub logs: Vec<SecurityLogEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewCounts {
    pub total_events: u64,
    pub action_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityOverview {
    pub overview: OverviewCounts,
    pub recent_actions: Vec<SecurityLogEntry>,
}

/// 页码来自查询参数，超大时截断到数据库可接受的偏移量
fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(limit)
        .min(i64::MAX as u64)
}

#[derive(Clone)]
pub struct SecurityLogService {
    store: Arc<dyn SecurityLogStore>,
}

impl SecurityLogService {
    pub fn new(store: Arc<dyn SecurityLogStore>) -> Self {
        Self { store }
    }

    /// 写入审计记录；失败只记录日志
    pub async fn record(
        &self,
        action: SecurityAction,
        user_id: Option<&str>,
        ctx: &RequestContext,
        details: Value,
    ) {
        let entry = NewSecurityLogEntry {
            user_id: user_id.map(String::from),
            action: action.as_ref().to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            details,
            timestamp: Utc::now(),
        };

        match self.store.append_security_log(entry).await {
            Ok(()) => debug!("Security event {} recorded", action.as_ref()),
            Err(e) => warn!("Failed to record security event {}: {}", action.as_ref(), e),
        }
    }

    pub async fn page(
        &self,
        user_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
        action: Option<&str>,
    ) -> Result<SecurityLogPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let action = action.map(str::trim).filter(|a| !a.is_empty());

        let (logs, total) = self
            .store
            .security_logs_page(user_id, action, page_offset(page, limit), limit)
            .await?;

        Ok(SecurityLogPage {
            logs,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    /// 最近 30 天的事件统计
    pub async fn overview(&self, user_id: &str) -> Result<SecurityOverview> {
        let since = Utc::now() - Duration::days(OVERVIEW_DAYS);
        let logs = self.store.security_logs_since(user_id, since).await?;

        let mut action_breakdown = BTreeMap::new();
        for log in &logs {
            *action_breakdown.entry(log.action.clone()).or_insert(0) += 1;
        }

        Ok(SecurityOverview {
            overview: OverviewCounts {
                total_events: logs.len() as u64,
                action_breakdown,
            },
            recent_actions: logs.into_iter().take(OVERVIEW_RECENT).collect(),
        })
    }
}
