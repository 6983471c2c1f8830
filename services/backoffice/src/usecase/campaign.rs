use chrono::Utc;
use uuid::Uuid;

use catraca_domain::status::PurchaseStatus;

use crate::domain::repository::{CampaignRepository, NotificationLedger, PurchaseRecordRepository};
use crate::domain::types::Campaign;
use crate::error::BackofficeError;

pub struct CreateCampaignInput {
    pub subject: String,
    pub title: String,
    pub body: String,
    pub status_filter: PurchaseStatus,
    pub include_credentials: bool,
    pub scheduled: bool,
}

pub struct CreateCampaignUseCase<C, R, L>
where
    C: CampaignRepository,
    R: PurchaseRecordRepository,
    L: NotificationLedger,
{
    pub campaigns: C,
    pub records: R,
    pub ledger: L,
}

impl<C, R, L> CreateCampaignUseCase<C, R, L>
where
    C: CampaignRepository,
    R: PurchaseRecordRepository,
    L: NotificationLedger,
{
    /// Persist the campaign, then queue it on every record currently matching its filter.
    pub async fn execute(&self, input: CreateCampaignInput) -> Result<Campaign, BackofficeError> {
        let campaign = Campaign {
            id: Uuid::now_v7(),
            subject: input.subject,
            title: input.title,
            body: input.body,
            status_filter: input.status_filter,
            include_credentials: input.include_credentials,
            scheduled: input.scheduled,
            sent_count: 0,
            failed_count: 0,
            created_at: Utc::now(),
        };
        self.campaigns.insert(&campaign).await?;

        let matching = self.records.list_by_status(campaign.status_filter).await?;
        for record in &matching {
            self.ledger.queue(record.id, campaign.id).await?;
        }

        tracing::info!(
            campaign_id = %campaign.id,
            status_filter = %campaign.status_filter,
            queued = matching.len(),
            "campaign created"
        );
        Ok(campaign)
    }
}
