use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

use crate::domain::repository::{CampaignRepository, NotificationLedger, PurchaseRecordRepository};
use crate::domain::types::{Participant, PurchaseRecord};
use crate::error::BackofficeError;

// ── CreateRecord ─────────────────────────────────────────────────────────────

pub struct NewParticipant {
    pub name: String,
    pub email: Option<String>,
    pub document: Option<String>,
}

pub struct CreateRecordInput {
    pub transaction_id: String,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub participants: Vec<NewParticipant>,
    pub metadata: serde_json::Value,
}

pub struct CreateRecordUseCase<R, L, C>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
{
    pub records: R,
    pub ledger: L,
    pub campaigns: C,
}

impl<R, L, C> CreateRecordUseCase<R, L, C>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
{
    pub async fn execute(&self, input: CreateRecordInput) -> Result<PurchaseRecord, BackofficeError> {
        let now = Utc::now();
        let mut record = PurchaseRecord {
            id: Uuid::now_v7(),
            transaction_id: input.transaction_id,
            status: input.status,
            payment_method: input.payment_method,
            participants: input
                .participants
                .into_iter()
                .map(|p| Participant::new(p.name, p.email, p.document))
                .collect(),
            metadata: input.metadata,
            sent_campaigns: BTreeSet::new(),
            pending_campaigns: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        self.records.insert(&record).await?;

        for campaign in self.campaigns.list_by_status_filter(record.status).await? {
            self.ledger.queue(record.id, campaign.id).await?;
            record.pending_campaigns.insert(campaign.id);
        }

        tracing::info!(
            record_id = %record.id,
            status = %record.status,
            participants = record.participants.len(),
            "purchase record created"
        );
        Ok(record)
    }
}

// ── GetRecord ────────────────────────────────────────────────────────────────

pub struct GetRecordUseCase<R: PurchaseRecordRepository> {
    pub records: R,
}

impl<R: PurchaseRecordRepository> GetRecordUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<PurchaseRecord, BackofficeError> {
        self.records
            .find_by_id(id)
            .await?
            .ok_or(BackofficeError::RecordNotFound)
    }
}
