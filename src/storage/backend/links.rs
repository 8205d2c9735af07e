//! tracked_links 读写

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DbErr, EntityTrait, ExprTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use crate::errors::{LinkTrackerError, Result};
use crate::storage::models::{
    LinkSummary, LinkUpdate, NewTrackedLink, TrackedLink, UtmParams,
};
use crate::storage::store::LinkStore;

use migration::entities::{link_click, tracked_link};

pub(super) fn model_to_link(model: tracked_link::Model) -> TrackedLink {
    TrackedLink {
        id: model.id,
        original_url: model.original_url,
        owner_id: model.owner_id,
        is_active: model.is_active,
        expires_at: model.expires_at,
        max_clicks: model.max_clicks,
        password_hash: model.password_hash,
        utm: UtmParams {
            utm_source: model.utm_source,
            utm_medium: model.utm_medium,
            utm_campaign: model.utm_campaign,
            utm_term: model.utm_term,
            utm_content: model.utm_content,
        },
        campaign_name: model.campaign_name,
        total_clicks: model.total_clicks,
        unique_clicks: model.unique_clicks,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[derive(Debug, FromQueryResult)]
struct SummaryRow {
    id: String,
    original_url: String,
    campaign_name: Option<String>,
    total_clicks: i64,
    unique_clicks: i64,
    is_active: bool,
}

/// 只包含发生变化的列；计数器保持 NotSet
fn update_to_active_model(update: LinkUpdate) -> tracked_link::ActiveModel {
    let mut model = tracked_link::ActiveModel {
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    if let Some(url) = update.original_url {
        model.original_url = Set(url);
    }
    if let Some(campaign_name) = update.campaign_name {
        model.campaign_name = Set(campaign_name);
    }
    if let Some(expires_at) = update.expires_at {
        model.expires_at = Set(expires_at);
    }
    if let Some(max_clicks) = update.max_clicks {
        model.max_clicks = Set(max_clicks);
    }
    if let Some(password_hash) = update.password_hash {
        model.password_hash = Set(password_hash);
    }
    if let Some(utm) = update.utm {
        model.utm_source = Set(utm.utm_source);
        model.utm_medium = Set(utm.utm_medium);
        model.utm_campaign = Set(utm.utm_campaign);
        model.utm_term = Set(utm.utm_term);
        model.utm_content = Set(utm.utm_content);
    }
    if let Some(is_active) = update.is_active {
        model.is_active = Set(is_active);
    }

    model
}

impl SeaOrmStorage {
    async fn delete_link_txn(&self, id: &str, owner_id: &str) -> std::result::Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        let owned = tracked_link::Entity::find()
            .filter(tracked_link::Column::Id.eq(id))
            .filter(tracked_link::Column::OwnerId.eq(owner_id))
            .one(&txn)
            .await?;
        if owned.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }

        link_click::Entity::delete_many()
            .filter(link_click::Column::LinkId.eq(id))
            .exec(&txn)
            .await?;
        tracked_link::Entity::delete_by_id(id.to_string())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn find_link_where(&self, op_name: &str, condition: Condition) -> Result<Option<TrackedLink>> {
        let db = &self.db;
        let model = self.read_retry.run(op_name, || async {
            tracked_link::Entity::find()
                .filter(condition.clone())
                .one(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询链接失败: {}", e)))?;

        Ok(model.map(model_to_link))
    }
}

#[async_trait]
impl LinkStore for SeaOrmStorage {
    async fn insert_link(&self, link: NewTrackedLink) -> Result<TrackedLink> {
        let now = Utc::now();
        let active = tracked_link::ActiveModel {
            id: Set(link.id.clone()),
            original_url: Set(link.original_url),
            owner_id: Set(link.owner_id),
            is_active: Set(true),
            expires_at: Set(link.expires_at),
            max_clicks: Set(link.max_clicks),
            password_hash: Set(link.password_hash),
            utm_source: Set(link.utm.utm_source),
            utm_medium: Set(link.utm.utm_medium),
            utm_campaign: Set(link.utm.utm_campaign),
            utm_term: Set(link.utm.utm_term),
            utm_content: Set(link.utm.utm_content),
            campaign_name: Set(link.campaign_name),
            total_clicks: Set(0),
            unique_clicks: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active
            .insert(&self.db)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("创建链接失败: {}", e)))?;

        info!("Tracked link created: {}", model.id);
        Ok(model_to_link(model))
    }

    async fn link_exists(&self, id: &str) -> Result<bool> {
        let db = &self.db;
        let found = self.read_retry.run("link_exists", || async {
            tracked_link::Entity::find_by_id(id.to_string())
                .select_only()
                .column(tracked_link::Column::Id)
                .into_tuple::<String>()
                .one(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询链接失败: {}", e)))?;

        Ok(found.is_some())
    }

    async fn find_active_link(&self, id: &str) -> Result<Option<TrackedLink>> {
        let condition = Condition::all()
            .add(tracked_link::Column::Id.eq(id))
            .add(tracked_link::Column::IsActive.eq(true));
        self.find_link_where("find_active_link", condition).await
    }

    async fn find_owned_link(&self, id: &str, owner_id: &str) -> Result<Option<TrackedLink>> {
        let condition = Condition::all()
            .add(tracked_link::Column::Id.eq(id))
            .add(tracked_link::Column::OwnerId.eq(owner_id));
        self.find_link_where("find_owned_link", condition).await
    }

    async fn list_links(&self, owner_id: &str) -> Result<Vec<TrackedLink>> {
        let db = &self.db;
        let models = self.read_retry.run("list_links", || async {
            tracked_link::Entity::find()
                .filter(tracked_link::Column::OwnerId.eq(owner_id))
                .order_by_desc(tracked_link::Column::CreatedAt)
                .all(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询链接列表失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_link).collect())
    }

    async fn list_link_summaries(&self, owner_id: &str) -> Result<Vec<LinkSummary>> {
        let db = &self.db;
        let rows = self.read_retry.run("list_link_summaries", || async {
            tracked_link::Entity::find()
                .select_only()
                .column(tracked_link::Column::Id)
                .column(tracked_link::Column::OriginalUrl)
                .column(tracked_link::Column::CampaignName)
                .column(tracked_link::Column::TotalClicks)
                .column(tracked_link::Column::UniqueClicks)
                .column(tracked_link::Column::IsActive)
                .filter(tracked_link::Column::OwnerId.eq(owner_id))
                .order_by_desc(tracked_link::Column::CreatedAt)
                .into_model::<SummaryRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| LinkTrackerError::database_operation(format!("查询链接摘要失败: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| LinkSummary {
                id: row.id,
                original_url: row.original_url,
                campaign_name: row.campaign_name,
                total_clicks: row.total_clicks,
                unique_clicks: row.unique_clicks,
                is_active: row.is_active,
            })
            .collect())
    }

    async fn update_link(
        &self,
        id: &str,
        owner_id: &str,
        update: LinkUpdate,
    ) -> Result<Option<TrackedLink>> {
        let result = tracked_link::Entity::update_many()
            .set(update_to_active_model(update))
            .filter(tracked_link::Column::Id.eq(id))
            .filter(tracked_link::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("更新链接失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        debug!("Tracked link updated: {}", id);
        self.find_owned_link(id, owner_id).await
    }

    async fn delete_link(&self, id: &str, owner_id: &str) -> Result<bool> {
        let deleted = self
            .delete_link_txn(id, owner_id)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("删除链接失败: {}", e)))?;

        if deleted {
            info!("Tracked link deleted: {}", id);
        }
        Ok(deleted)
    }

    async fn increment_clicks(&self, id: &str, unique: bool) -> Result<()> {
        let mut stmt = tracked_link::Entity::update_many().col_expr(
            tracked_link::Column::TotalClicks,
            Expr::col(tracked_link::Column::TotalClicks).add(1),
        );
        if unique {
            stmt = stmt.col_expr(
                tracked_link::Column::UniqueClicks,
                Expr::col(tracked_link::Column::UniqueClicks).add(1),
            );
        }

        // 自增不是幂等的：连接在提交后断开时重试会重复计数
        let result = stmt
            .filter(tracked_link::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| LinkTrackerError::database_operation(format!("更新点击计数失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(LinkTrackerError::not_found(format!(
                "Link not found: {}",
                id
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| LinkTrackerError::database_connection(e.to_string()))
    }
}
