use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::TransactionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseRecords::Status).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseRecords::PaymentMethod)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::Participants)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::Metadata)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::SentCampaigns)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::PendingCampaigns)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Dispatch and resync both scan by status.
        manager
            .create_index(
                Index::create()
                    .table(PurchaseRecords::Table)
                    .col(PurchaseRecords::Status)
                    .name("idx_purchase_records_status")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PurchaseRecords {
    Table,
    Id,
    TransactionId,
    Status,
    PaymentMethod,
    Participants,
    Metadata,
    SentCampaigns,
    PendingCampaigns,
    CreatedAt,
    UpdatedAt,
}
