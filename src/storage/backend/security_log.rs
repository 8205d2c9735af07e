//! security_logs 读写

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::SeaOrmStorage;
use crate::errors::{LinkTrackerError, Result};
use crate::storage::models::{NewSecurityLogEntry, SecurityLogEntry};
use crate::storage::store::SecurityLogStore;

use migration::entities::security_log;

fn model_to_entry(model: security_log::Model) -> SecurityLogEntry {
    // 历史数据中 details 不一定是合法 JSON，按原文保留
    let details = serde_json::from_str(&model.details)
        .unwrap_or(serde_json::Value::String(model.details));

    SecurityLogEntry {
        id: model.id,
        user_id: model.user_id,
        action: model.action,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        details,
        timestamp: model.timestamp,
    }
}

#[async_trait]
impl SecurityLogStore for SeaOrmStorage {
    async fn append_security_log(&self, entry: NewSecurityLogEntry) -> Result<()> {
        let active = security_log::ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            details: Set(entry.details.to_string()),
            timestamp: Set(entry.timestamp),
            ..Default::default()
        };

        security_log::Entity::insert(active)
            .exec(&self.db)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("写入安全日志失败: {}", e)))?;

        Ok(())
    }

    async fn security_logs_page(
        &self,
        user_id: &str,
        action: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<SecurityLogEntry>, u64)> {
        let mut query = security_log::Entity::find()
            .filter(security_log::Column::UserId.eq(user_id));
        if let Some(action) = action {
            query = query.filter(security_log::Column::Action.eq(action));
        }

        let db = &self.db;
        let total = self.read_retry.run("security_logs_page(count)", || async {
            query.clone().count(db).await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("统计安全日志失败: {}", e)))?;

        let models = self.read_retry.run("security_logs_page(data)", || async {
            query
                .clone()
                .order_by_desc(security_log::Column::Timestamp)
                .order_by_desc(security_log::Column::Id)
                .offset(offset)
                .limit(limit)
                .all(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询安全日志失败: {}", e)))?;

        Ok((models.into_iter().map(model_to_entry).collect(), total))
    }

    async fn security_logs_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SecurityLogEntry>> {
        let db = &self.db;
        let models = self.read_retry.run("security_logs_since", || async {
            security_log::Entity::find()
                .filter(security_log::Column::UserId.eq(user_id))
                .filter(security_log::Column::Timestamp.gte(since))
                .order_by_desc(security_log::Column::Timestamp)
                .order_by_desc(security_log::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询安全日志失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_entry).collect())
    }
}
