use sea_orm::entity::prelude::*;

/// Gate check-in audit trail, one row per successful redemption.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "redemption_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub record_id: Uuid,
    pub participant_id: Uuid,
    pub participant_index: i32,
    pub day: chrono::NaiveDate,
    pub redeemed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_records::Entity",
        from = "Column::RecordId",
        to = "super::purchase_records::Column::Id",
        on_delete = "Cascade"
    )]
    PurchaseRecord,
}

impl Related<super::purchase_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
