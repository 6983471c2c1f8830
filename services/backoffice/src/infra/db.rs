use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionError, TransactionTrait,
    sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use catraca_backoffice_schema::{campaigns, purchase_records, redemption_logs};
use catraca_domain::status::PurchaseStatus;

use crate::domain::repository::{CampaignRepository, NotificationLedger, PurchaseRecordRepository};
use crate::domain::types::{
    Campaign, CredentialWrite, CredentialWriteOutcome, PurchaseRecord, RedeemOutcome,
    RedemptionLog, RedemptionRequest, StatusUpdate,
};
use crate::error::BackofficeError;

// ── Document helpers ─────────────────────────────────────────────────────────

fn record_from_model(model: purchase_records::Model) -> anyhow::Result<PurchaseRecord> {
    Ok(PurchaseRecord {
        id: model.id,
        status: model
            .status
            .parse()
            .with_context(|| format!("record {} status", model.id))?,
        payment_method: serde_json::from_value(model.payment_method)
            .with_context(|| format!("record {} payment method", model.id))?,
        participants: serde_json::from_value(model.participants)
            .with_context(|| format!("record {} participants", model.id))?,
        sent_campaigns: serde_json::from_value(model.sent_campaigns)
            .with_context(|| format!("record {} sent campaigns", model.id))?,
        pending_campaigns: serde_json::from_value(model.pending_campaigns)
            .with_context(|| format!("record {} pending campaigns", model.id))?,
        transaction_id: model.transaction_id,
        metadata: model.metadata,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, DbErr> {
    serde_json::to_value(value).map_err(|e| DbErr::Custom(format!("encode document: {e}")))
}

/// `SELECT … FOR UPDATE` on one record inside `txn`.
async fn lock_record(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<Option<PurchaseRecord>, DbErr> {
    let model = purchase_records::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?;
    model
        .map(record_from_model)
        .transpose()
        .map_err(|e| DbErr::Custom(format!("{e:#}")))
}

/// Write back the mutable parts of a locked record.
async fn save_record(txn: &DatabaseTransaction, record: &PurchaseRecord) -> Result<(), DbErr> {
    purchase_records::ActiveModel {
        id: Set(record.id),
        status: Set(record.status.as_str().to_owned()),
        participants: Set(to_json(&record.participants)?),
        sent_campaigns: Set(to_json(&record.sent_campaigns)?),
        pending_campaigns: Set(to_json(&record.pending_campaigns)?),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .update(txn)
    .await?;
    Ok(())
}

fn redemption_log_model(log: &RedemptionLog) -> Result<redemption_logs::ActiveModel, DbErr> {
    Ok(redemption_logs::ActiveModel {
        id: Set(log.id),
        record_id: Set(log.record_id),
        participant_id: Set(log.participant_id),
        participant_index: Set(
            i32::try_from(log.participant_index).map_err(|e| DbErr::Custom(e.to_string()))?,
        ),
        day: Set(log.day.0),
        redeemed_at: Set(log.redeemed_at),
    })
}

/// Row-locked read-modify-write. `apply` returns its result and whether it changed the
/// record; unchanged records are not written. `None` if the record does not exist.
async fn modify_record<T, F>(
    db: &DatabaseConnection,
    id: Uuid,
    apply: F,
) -> Result<Option<T>, TransactionError<DbErr>>
where
    T: Send + 'static,
    F: FnOnce(&mut PurchaseRecord) -> (T, bool) + Send + 'static,
{
    db.transaction::<_, Option<T>, DbErr>(move |txn| {
        Box::pin(async move {
            let Some(mut record) = lock_record(txn, id).await? else {
                return Ok(None);
            };
            let (value, changed) = apply(&mut record);
            if changed {
                save_record(txn, &record).await?;
            }
            Ok(Some(value))
        })
    })
    .await
}

// ── Purchase record repository ───────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPurchaseRecordRepository {
    pub db: DatabaseConnection,
}

impl PurchaseRecordRepository for DbPurchaseRecordRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PurchaseRecord>, BackofficeError> {
        let model = purchase_records::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find purchase record by id")?;
        Ok(model.map(record_from_model).transpose()?)
    }

    async fn list_by_status(
        &self,
        status: PurchaseStatus,
    ) -> Result<Vec<PurchaseRecord>, BackofficeError> {
        let models = purchase_records::Entity::find()
            .filter(purchase_records::Column::Status.eq(status.as_str()))
            .order_by_asc(purchase_records::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list purchase records by status")?;
        Ok(models
            .into_iter()
            .map(record_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn insert(&self, record: &PurchaseRecord) -> Result<(), BackofficeError> {
        purchase_records::ActiveModel {
            id: Set(record.id),
            transaction_id: Set(record.transaction_id.clone()),
            status: Set(record.status.as_str().to_owned()),
            payment_method: Set(to_json(&record.payment_method).context("encode payment method")?),
            participants: Set(to_json(&record.participants).context("encode participants")?),
            metadata: Set(record.metadata.clone()),
            sent_campaigns: Set(to_json(&record.sent_campaigns).context("encode sent campaigns")?),
            pending_campaigns: Set(
                to_json(&record.pending_campaigns).context("encode pending campaigns")?,
            ),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
        .insert(&self.db)
        .await
        .context("insert purchase record")?;
        Ok(())
    }

    async fn store_credentials(
        &self,
        write: &CredentialWrite,
    ) -> Result<CredentialWriteOutcome, BackofficeError> {
        let write = write.clone();
        let outcome = modify_record(&self.db, write.record_id, move |record| {
            match record.participants.get_mut(write.participant_index as usize) {
                Some(participant) => {
                    let outcome = write.apply_to(participant);
                    let changed = outcome == CredentialWriteOutcome::Written;
                    (outcome, changed)
                }
                None => (CredentialWriteOutcome::ParticipantMissing, false),
            }
        })
        .await
        .context("store participant credentials")?;
        Ok(outcome.unwrap_or(CredentialWriteOutcome::ParticipantMissing))
    }

    async fn redeem(&self, request: &RedemptionRequest) -> Result<RedeemOutcome, BackofficeError> {
        let request = request.clone();
        let outcome = self
            .db
            .transaction::<_, RedeemOutcome, DbErr>(move |txn| {
                Box::pin(async move {
                    let Some(mut record) = lock_record(txn, request.record_id).await? else {
                        return Ok(RedeemOutcome::RecordNotFound);
                    };
                    let Some(participant) = record
                        .participants
                        .get_mut(request.participant_index as usize)
                    else {
                        return Ok(RedeemOutcome::ParticipantNotFound);
                    };
                    let stored = participant.credentials.get(&request.day);
                    if stored.map(String::as_str) != Some(request.payload.as_str()) {
                        return Ok(RedeemOutcome::Stale);
                    }
                    if participant.is_redeemed(&request.day) {
                        return Ok(RedeemOutcome::AlreadyRedeemed);
                    }
                    participant.redemption_state.insert(request.day, true);
                    let participant_id = participant.id;
                    let participant_name = participant.name.clone();

                    save_record(txn, &record).await?;
                    let log = RedemptionLog {
                        id: Uuid::now_v7(),
                        record_id: request.record_id,
                        participant_id,
                        participant_index: request.participant_index,
                        day: request.day,
                        redeemed_at: request.redeemed_at,
                    };
                    redemption_log_model(&log)?.insert(txn).await?;

                    Ok(RedeemOutcome::Redeemed {
                        participant_id,
                        participant_name,
                    })
                })
            })
            .await
            .context("redeem credential")?;
        Ok(outcome)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: Option<PurchaseStatus>,
        status: PurchaseStatus,
    ) -> Result<StatusUpdate, BackofficeError> {
        let update = modify_record(&self.db, id, move |record| {
            let previous = record.status;
            if expected.is_some_and(|expected| expected != previous) {
                return (StatusUpdate::Superseded { current: previous }, false);
            }
            record.status = status;
            (StatusUpdate::Updated { previous }, previous != status)
        })
        .await
        .context("update purchase record status")?;
        Ok(update.unwrap_or(StatusUpdate::NotFound))
    }
}

// ── Notification ledger ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbNotificationLedger {
    pub db: DatabaseConnection,
}

impl NotificationLedger for DbNotificationLedger {
    async fn mark_sent(&self, record_id: Uuid, campaign_id: Uuid) -> Result<(), BackofficeError> {
        modify_record(&self.db, record_id, move |record| {
            let added = record.sent_campaigns.insert(campaign_id);
            let removed = record.pending_campaigns.remove(&campaign_id);
            ((), added || removed)
        })
        .await
        .context("mark campaign sent")?;
        Ok(())
    }

    async fn mark_participant_sent(
        &self,
        record_id: Uuid,
        participant_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<(), BackofficeError> {
        modify_record(&self.db, record_id, move |record| {
            let changed = record
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id)
                .is_some_and(|p| p.sent_campaigns.insert(campaign_id));
            ((), changed)
        })
        .await
        .context("mark campaign sent to participant")?;
        Ok(())
    }

    async fn queue(&self, record_id: Uuid, campaign_id: Uuid) -> Result<(), BackofficeError> {
        modify_record(&self.db, record_id, move |record| {
            if record.sent_campaigns.contains(&campaign_id) {
                return ((), false);
            }
            ((), record.pending_campaigns.insert(campaign_id))
        })
        .await
        .context("queue campaign")?;
        Ok(())
    }

    async fn dequeue_all(&self, record_id: Uuid) -> Result<(), BackofficeError> {
        modify_record(&self.db, record_id, |record| {
            let changed = !record.pending_campaigns.is_empty();
            record.pending_campaigns.clear();
            ((), changed)
        })
        .await
        .context("dequeue pending campaigns")?;
        Ok(())
    }
}

// ── Campaign repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCampaignRepository {
    pub db: DatabaseConnection,
}

impl CampaignRepository for DbCampaignRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, BackofficeError> {
        let model = campaigns::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find campaign by id")?;
        Ok(model.map(campaign_from_model).transpose()?)
    }

    async fn insert(&self, campaign: &Campaign) -> Result<(), BackofficeError> {
        campaigns::ActiveModel {
            id: Set(campaign.id),
            subject: Set(campaign.subject.clone()),
            title: Set(campaign.title.clone()),
            body: Set(campaign.body.clone()),
            status_filter: Set(campaign.status_filter.as_str().to_owned()),
            include_credentials: Set(campaign.include_credentials),
            scheduled: Set(campaign.scheduled),
            sent_count: Set(campaign.sent_count),
            failed_count: Set(campaign.failed_count),
            created_at: Set(campaign.created_at),
        }
        .insert(&self.db)
        .await
        .context("insert campaign")?;
        Ok(())
    }

    async fn list_by_status_filter(
        &self,
        status: PurchaseStatus,
    ) -> Result<Vec<Campaign>, BackofficeError> {
        let models = campaigns::Entity::find()
            .filter(campaigns::Column::StatusFilter.eq(status.as_str()))
            .order_by_asc(campaigns::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list campaigns by status filter")?;
        Ok(models
            .into_iter()
            .map(campaign_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn list_scheduled(&self) -> Result<Vec<Campaign>, BackofficeError> {
        let models = campaigns::Entity::find()
            .filter(campaigns::Column::Scheduled.eq(true))
            .order_by_asc(campaigns::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list scheduled campaigns")?;
        Ok(models
            .into_iter()
            .map(campaign_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn record_progress(
        &self,
        id: Uuid,
        sent: i64,
        failed: i64,
    ) -> Result<(), BackofficeError> {
        campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::SentCount,
                Expr::col(campaigns::Column::SentCount).add(sent),
            )
            .col_expr(
                campaigns::Column::FailedCount,
                Expr::col(campaigns::Column::FailedCount).add(failed),
            )
            .filter(campaigns::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("record campaign progress")?;
        Ok(())
    }
}

fn campaign_from_model(model: campaigns::Model) -> anyhow::Result<Campaign> {
    Ok(Campaign {
        id: model.id,
        status_filter: model
            .status_filter
            .parse()
            .with_context(|| format!("campaign {} status filter", model.id))?,
        subject: model.subject,
        title: model.title,
        body: model.body,
        include_credentials: model.include_credentials,
        scheduled: model.scheduled,
        sent_count: model.sent_count,
        failed_count: model.failed_count,
        created_at: model.created_at,
    })
}
