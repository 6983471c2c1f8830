use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RedemptionLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedemptionLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RedemptionLogs::RecordId).uuid().not_null())
                    .col(ColumnDef::new(RedemptionLogs::ParticipantId).uuid().not_null())
                    .col(
                        ColumnDef::new(RedemptionLogs::ParticipantIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedemptionLogs::Day).date().not_null())
                    .col(
                        ColumnDef::new(RedemptionLogs::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RedemptionLogs::Table, RedemptionLogs::RecordId)
                            .to(PurchaseRecords::Table, PurchaseRecords::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(RedemptionLogs::Table)
                    .col(RedemptionLogs::RecordId)
                    .col(RedemptionLogs::Day)
                    .name("idx_redemption_logs_record_day")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedemptionLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RedemptionLogs {
    Table,
    Id,
    RecordId,
    ParticipantId,
    ParticipantIndex,
    Day,
    RedeemedAt,
}

#[derive(Iden)]
enum PurchaseRecords {
    Table,
    Id,
}
