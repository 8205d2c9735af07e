//! 点击事件表（只追加），每次通过策略校验的跳转写入一行

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "link_clicks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub link_id: String,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub is_unique: bool,
    pub clicked_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tracked_link::Entity",
        from = "Column::LinkId",
        to = "super::tracked_link::Column::Id",
        on_delete = "Cascade"
    )]
    TrackedLink,
}

impl Related<super::tracked_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackedLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
