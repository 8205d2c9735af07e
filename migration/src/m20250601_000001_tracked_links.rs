//! 追踪链接表迁移

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackedLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackedLinks::Id)
                            .string_len(20)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackedLinks::OriginalUrl).text().not_null())
                    .col(ColumnDef::new(TrackedLinks::OwnerId).string_len(255).not_null())
                    .col(
                        ColumnDef::new(TrackedLinks::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(TrackedLinks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(TrackedLinks::MaxClicks).big_integer().null())
                    .col(ColumnDef::new(TrackedLinks::PasswordHash).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::UtmSource).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::UtmMedium).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::UtmCampaign).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::UtmTerm).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::UtmContent).string_len(255).null())
                    .col(ColumnDef::new(TrackedLinks::CampaignName).string_len(255).null())
                    .col(
                        ColumnDef::new(TrackedLinks::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrackedLinks::UniqueClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrackedLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackedLinks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 仪表盘按 owner 拉取全部链接
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracked_links_owner")
                    .table(TrackedLinks::Table)
                    .col(TrackedLinks::OwnerId)
                    .col(TrackedLinks::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tracked_links_owner").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TrackedLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum TrackedLinks {
    #[sea_orm(iden = "tracked_links")]
    Table,
    Id,
    OriginalUrl,
    OwnerId,
    IsActive,
    ExpiresAt,
    MaxClicks,
    PasswordHash,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
    CampaignName,
    TotalClicks,
    UniqueClicks,
    CreatedAt,
    UpdatedAt,
}
