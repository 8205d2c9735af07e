//! 点击事件表迁移
//!
//! link_clicks 记录每一次跳转的访客信息，并通过外键随链接级联删除。

use sea_orm_migration::prelude::*;

use crate::m20250601_000001_tracked_links::TrackedLinks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LinkClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinkClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LinkClicks::LinkId).string_len(20).not_null())
                    .col(ColumnDef::new(LinkClicks::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(LinkClicks::UserAgent).text().null())
                    .col(ColumnDef::new(LinkClicks::Referrer).text().null())
                    .col(ColumnDef::new(LinkClicks::Country).string_len(100).null())
                    .col(ColumnDef::new(LinkClicks::City).string_len(100).null())
                    .col(ColumnDef::new(LinkClicks::DeviceType).string_len(20).null())
                    .col(ColumnDef::new(LinkClicks::Browser).string_len(100).null())
                    .col(
                        ColumnDef::new(LinkClicks::OperatingSystem)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LinkClicks::IsUnique)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LinkClicks::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_link_clicks_link_id")
                            .from(LinkClicks::Table, LinkClicks::LinkId)
                            .to(TrackedLinks::Table, TrackedLinks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 单链接时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_link_clicks_link_time")
                    .table(LinkClicks::Table)
                    .col(LinkClicks::LinkId)
                    .col(LinkClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 唯一访客判定 (link_id, ip, ua)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_link_clicks_visitor")
                    .table(LinkClicks::Table)
                    .col(LinkClicks::LinkId)
                    .col(LinkClicks::IpAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_link_clicks_visitor").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_link_clicks_link_time").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LinkClicks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LinkClicks {
    #[sea_orm(iden = "link_clicks")]
    Table,
    Id,
    LinkId,
    IpAddress,
    UserAgent,
    Referrer,
    Country,
    City,
    DeviceType,
    Browser,
    OperatingSystem,
    IsUnique,
    ClickedAt,
}
