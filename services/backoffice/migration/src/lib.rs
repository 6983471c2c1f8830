use sea_orm_migration::prelude::*;

mod m20261001_000001_create_purchase_records;
mod m20261001_000002_create_campaigns;
mod m20261001_000003_create_redemption_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_purchase_records::Migration),
            Box::new(m20261001_000002_create_campaigns::Migration),
            Box::new(m20261001_000003_create_redemption_logs::Migration),
        ]
    }
}
