use sea_orm::entity::prelude::*;

/// Purchase record document. Participants and campaign sets are embedded as JSONB.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub status: String,
    pub payment_method: Json,
    pub participants: Json,
    pub metadata: Json,
    pub sent_campaigns: Json,
    pub pending_campaigns: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::redemption_logs::Entity")]
    RedemptionLogs,
}

impl Related<super::redemption_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RedemptionLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
