use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use catraca_core::retry::{RetryPolicy, retry_with_backoff};
use catraca_domain::payment::map_gateway_status;
use catraca_domain::status::PurchaseStatus;

use crate::domain::repository::{
    CampaignRepository, NotificationLedger, PaymentGateway, PurchaseRecordRepository,
};
use crate::domain::types::PurchaseRecord;
use crate::error::{BackofficeError, GatewayError};
use crate::usecase::ledger::change_status;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResyncFailure {
    pub record_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub checked: u32,
    pub transitioned: u32,
    pub unchanged: u32,
    pub errors: Vec<ResyncFailure>,
}

pub struct ResyncPendingPaymentsUseCase<R, L, C, G>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
    G: PaymentGateway,
{
    pub records: R,
    pub ledger: L,
    pub campaigns: C,
    pub gateway: G,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
}

enum Resynced {
    Transitioned,
    Unchanged,
}

impl<R, L, C, G> ResyncPendingPaymentsUseCase<R, L, C, G>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
    G: PaymentGateway,
{
    /// Re-check every pending record against the gateway. A failing record is reported and
    /// the sweep moves on.
    pub async fn execute(&self) -> Result<ResyncReport, BackofficeError> {
        let pending = self.records.list_by_status(PurchaseStatus::Pending).await?;
        let mut report = ResyncReport::default();

        for record in &pending {
            report.checked += 1;
            match self.resync_one(record).await {
                Ok(Resynced::Transitioned) => report.transitioned += 1,
                Ok(Resynced::Unchanged) => report.unchanged += 1,
                Err(reason) => {
                    tracing::warn!(record_id = %record.id, %reason, "payment resync failed");
                    report.errors.push(ResyncFailure {
                        record_id: record.id,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            transitioned = report.transitioned,
            unchanged = report.unchanged,
            errors = report.errors.len(),
            "payment resync finished"
        );
        Ok(report)
    }

    async fn resync_one(&self, record: &PurchaseRecord) -> Result<Resynced, String> {
        let gateway = &self.gateway;
        let call_timeout = self.call_timeout;
        let transaction_id = record.transaction_id.as_str();
        let method = &record.payment_method;

        let raw = retry_with_backoff(&self.retry, GatewayError::is_retryable, move || async move {
            match tokio::time::timeout(call_timeout, gateway.fetch_status(transaction_id, method))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Transient("gateway call timed out".to_owned())),
            }
        })
        .await
        .map_err(|e| e.to_string())?;

        let Some(status) = map_gateway_status(&raw) else {
            tracing::warn!(
                record_id = %record.id,
                transaction_id,
                gateway_status = %raw,
                "unrecognised gateway status, leaving record unchanged"
            );
            return Ok(Resynced::Unchanged);
        };
        if status == record.status {
            return Ok(Resynced::Unchanged);
        }

        let changed = change_status(
            &self.records,
            &self.ledger,
            &self.campaigns,
            record.id,
            Some(PurchaseStatus::Pending),
            status,
        )
        .await
        .map_err(|e| e.to_string())?;
        Ok(match changed {
            Some(_) => Resynced::Transitioned,
            None => Resynced::Unchanged,
        })
    }
}
