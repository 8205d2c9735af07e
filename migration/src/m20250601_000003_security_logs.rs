//! 安全审计日志表迁移

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SecurityLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecurityLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecurityLogs::UserId).string_len(255).null())
                    .col(ColumnDef::new(SecurityLogs::Action).string_len(64).not_null())
                    .col(ColumnDef::new(SecurityLogs::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(SecurityLogs::UserAgent).text().null())
                    .col(ColumnDef::new(SecurityLogs::Details).text().not_null())
                    .col(
                        ColumnDef::new(SecurityLogs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_security_logs_user_time")
                    .table(SecurityLogs::Table)
                    .col(SecurityLogs::UserId)
                    .col(SecurityLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_security_logs_user_time").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SecurityLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SecurityLogs {
    #[sea_orm(iden = "security_logs")]
    Table,
    Id,
    UserId,
    Action,
    IpAddress,
    UserAgent,
    Details,
    Timestamp,
}
