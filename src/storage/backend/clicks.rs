//! link_clicks 读写

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::debug;

use super::SeaOrmStorage;
use crate::errors::{LinkTrackerError, Result};
use crate::storage::models::{ClickEvent, NewClickEvent};
use crate::storage::store::ClickStore;

use migration::entities::link_click;

fn model_to_click(model: link_click::Model) -> ClickEvent {
    ClickEvent {
        id: model.id,
        link_id: model.link_id,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        referrer: model.referrer,
        country: model.country,
        city: model.city,
        device_type: model.device_type,
        browser: model.browser,
        operating_system: model.operating_system,
        is_unique: model.is_unique,
        clicked_at: model.clicked_at,
    }
}

#[async_trait]
impl ClickStore for SeaOrmStorage {
    async fn has_prior_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<bool> {
        // NULL 与 NULL 视为同一访客
        let ip_filter = match ip_address {
            Some(ip) => link_click::Column::IpAddress.eq(ip),
            None => link_click::Column::IpAddress.is_null(),
        };
        let ua_filter = match user_agent {
            Some(ua) => link_click::Column::UserAgent.eq(ua),
            None => link_click::Column::UserAgent.is_null(),
        };

        let db = &self.db;
        let found = self.read_retry.run("has_prior_click", || async {
            link_click::Entity::find()
                .select_only()
                .column(link_click::Column::Id)
                .filter(link_click::Column::LinkId.eq(link_id))
                .filter(ip_filter.clone())
                .filter(ua_filter.clone())
                .into_tuple::<i64>()
                .one(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询历史点击失败: {}", e)))?;

        Ok(found.is_some())
    }

    async fn insert_click(&self, click: NewClickEvent) -> Result<()> {
        let active = link_click::ActiveModel {
            link_id: Set(click.link_id.clone()),
            ip_address: Set(click.ip_address),
            user_agent: Set(click.user_agent),
            referrer: Set(click.referrer),
            country: Set(click.country),
            city: Set(click.city),
            device_type: Set(click.device_type),
            browser: Set(click.browser),
            operating_system: Set(click.operating_system),
            is_unique: Set(click.is_unique),
            clicked_at: Set(click.clicked_at),
            ..Default::default()
        };

        // 写操作只执行一次，重试可能产生重复记录
        link_click::Entity::insert(active)
            .exec(&self.db)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("写入点击记录失败: {}", e)))?;

        debug!("Click recorded for {}", click.link_id);
        Ok(())
    }

    async fn clicks_in_window(
        &self,
        link_ids: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClickEvent>> {
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }

        let db = &self.db;
        let models = self.read_retry.run("clicks_in_window", || async {
            link_click::Entity::find()
                .filter(link_click::Column::LinkId.is_in(link_ids.iter().cloned()))
                .filter(link_click::Column::ClickedAt.gte(since))
                .filter(link_click::Column::ClickedAt.lte(until))
                .order_by_desc(link_click::Column::ClickedAt)
                .all(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询点击记录失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_click).collect())
    }
}
