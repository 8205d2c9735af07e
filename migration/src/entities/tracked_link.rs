use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tracked_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub original_url: String,
    pub owner_id: String,
    pub is_active: bool,
    pub expires_at: Option<DateTimeUtc>,
    pub max_clicks: Option<i64>,
    pub password_hash: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub campaign_name: Option<String>,
    /// 只通过原子自增修改
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::link_click::Entity")]
    LinkClick,
}

impl Related<super::link_click::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LinkClick.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
