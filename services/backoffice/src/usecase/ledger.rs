use uuid::Uuid;

use catraca_domain::status::PurchaseStatus;

use crate::domain::repository::{CampaignRepository, NotificationLedger, PurchaseRecordRepository};
use crate::domain::types::StatusUpdate;
use crate::error::BackofficeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStatusOutput {
    pub record_id: Uuid,
    pub previous: PurchaseStatus,
    pub status: PurchaseStatus,
    /// Campaigns now pending on the record.
    pub queued: Vec<Uuid>,
}

pub struct ChangeRecordStatusUseCase<R, L, C>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
{
    pub records: R,
    pub ledger: L,
    pub campaigns: C,
}

impl<R, L, C> ChangeRecordStatusUseCase<R, L, C>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
{
    pub async fn execute(
        &self,
        record_id: Uuid,
        status: PurchaseStatus,
    ) -> Result<ChangeStatusOutput, BackofficeError> {
        change_status(&self.records, &self.ledger, &self.campaigns, record_id, None, status)
            .await?
            .ok_or_else(|| anyhow::anyhow!("unconditional status update was superseded").into())
    }
}

/// Move a record to `status` and re-target its pending campaigns.
///
/// Pending entries from the old status are dropped; every campaign filtering on the new
/// status that the record has not received yet is queued. With `expected`, nothing changes
/// unless the record still has that status, and `None` is returned.
pub async fn change_status<R, L, C>(
    records: &R,
    ledger: &L,
    campaigns: &C,
    record_id: Uuid,
    expected: Option<PurchaseStatus>,
    status: PurchaseStatus,
) -> Result<Option<ChangeStatusOutput>, BackofficeError>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
{
    let record = records
        .find_by_id(record_id)
        .await?
        .ok_or(BackofficeError::RecordNotFound)?;

    let previous = match records.update_status(record_id, expected, status).await? {
        StatusUpdate::Updated { previous } => previous,
        StatusUpdate::Superseded { current } => {
            tracing::info!(
                %record_id,
                ?expected,
                %current,
                "record status moved on, skipping update"
            );
            return Ok(None);
        }
        StatusUpdate::NotFound => return Err(BackofficeError::RecordNotFound),
    };
    ledger.dequeue_all(record_id).await?;

    let mut queued = Vec::new();
    for campaign in campaigns.list_by_status_filter(status).await? {
        if ledger.already_sent(&record, campaign.id) {
            continue;
        }
        ledger.queue(record_id, campaign.id).await?;
        queued.push(campaign.id);
    }

    tracing::info!(
        %record_id,
        from = %previous,
        to = %status,
        queued = queued.len(),
        "record status changed"
    );

    Ok(Some(ChangeStatusOutput {
        record_id,
        previous,
        status,
        queued,
    }))
}
