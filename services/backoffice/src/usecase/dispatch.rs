use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use catraca_core::retry::{RetryPolicy, retry_with_backoff};
use catraca_domain::event_day::EventCalendar;

use crate::domain::html::escape_html;
use crate::domain::repository::{
    AttachmentRenderer, CampaignRepository, DispatchLease, MailTransport, NotificationLedger,
    PurchaseRecordRepository,
};
use crate::domain::sender::{SenderIdentity, SenderPool};
use crate::domain::types::{Campaign, OutgoingMail, PurchaseRecord};
use crate::error::{BackofficeError, MailError};
use crate::usecase::credential::{IssueCredentialsInput, issue_credentials};
use crate::usecase::signature::SignatureEngine;

/// Mail skeleton every campaign is rendered into.
pub const MAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{{subject}}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2>{{title}}</h2>
        <p>Hello, {{name}}.</p>
        {{body}}
    </div>
</body>
</html>
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub record_id: Uuid,
    pub participant_id: Uuid,
    pub reason: String,
    pub retryable: bool,
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub campaign_id: Uuid,
    pub sent: u32,
    /// Recipients skipped: no address, duplicate address in the same record, or already
    /// delivered to that participant in an earlier run.
    pub skipped: u32,
    /// Records skipped because the ledger already holds the campaign.
    pub already_delivered: u32,
    pub failed: Vec<DeliveryFailure>,
    pub quota_exhausted: bool,
    /// Recipients not attempted because the run stopped early.
    pub unprocessed: u32,
    pub already_running: bool,
    /// The dispatch lease expired or was taken over mid-run.
    pub lease_lost: bool,
}

impl DeliveryReport {
    fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            sent: 0,
            skipped: 0,
            already_delivered: 0,
            failed: Vec::new(),
            quota_exhausted: false,
            unprocessed: 0,
            already_running: false,
            lease_lost: false,
        }
    }

    fn already_running(campaign_id: Uuid) -> Self {
        Self {
            already_running: true,
            ..Self::new(campaign_id)
        }
    }
}

#[derive(Debug, Clone)]
struct Recipient {
    index: u32,
    participant_id: Uuid,
    name: String,
    email: String,
}

struct RecordPlan<'a> {
    record: &'a PurchaseRecord,
    recipients: Vec<Recipient>,
}

struct AttemptFailure {
    reason: String,
    retryable: bool,
}

impl From<MailError> for AttemptFailure {
    fn from(err: MailError) -> Self {
        Self {
            retryable: err.is_retryable(),
            reason: err.to_string(),
        }
    }
}

pub struct DispatchCampaignUseCase<R, L, C, M, A, K>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
    M: MailTransport,
    A: AttachmentRenderer,
    K: DispatchLease,
{
    pub records: R,
    pub ledger: L,
    pub campaigns: C,
    pub mail: M,
    pub renderer: A,
    pub lease: K,
    pub senders: Arc<SenderPool>,
    pub signer: Arc<SignatureEngine>,
    pub calendar: Arc<EventCalendar>,
    pub send_timeout: Duration,
    /// Applied to idempotent store calls: the record listing and ledger marks.
    pub store_retry: RetryPolicy,
}

impl<R, L, C, M, A, K> DispatchCampaignUseCase<R, L, C, M, A, K>
where
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
    M: MailTransport,
    A: AttachmentRenderer,
    K: DispatchLease,
{
    pub async fn execute(&self, campaign_id: Uuid) -> Result<DeliveryReport, BackofficeError> {
        let Some(lease) = self.lease.try_acquire().await? else {
            tracing::info!(%campaign_id, "dispatch already running, skipping");
            return Ok(DeliveryReport::already_running(campaign_id));
        };

        self.senders.reset_if_new_day(Utc::now().date_naive());

        let campaign = self
            .campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or(BackofficeError::CampaignNotFound)?;

        let status = campaign.status_filter;
        let repo = &self.records;
        let records =
            retry_with_backoff(&self.store_retry, BackofficeError::is_transient, move || {
                repo.list_by_status(status)
            })
            .await?;

        let mut report = DeliveryReport::new(campaign_id);
        let plans = self.plan(&campaign, &records, &mut report);
        let total: usize = plans.iter().map(|p| p.recipients.len()).sum();
        let mut attempted = 0usize;

        tracing::info!(
            %campaign_id,
            records = plans.len(),
            recipients = total,
            "dispatch started"
        );

        'records: for plan in &plans {
            let mut record_complete = true;
            for recipient in &plan.recipients {
                let unprocessed = u32::try_from(total - attempted).unwrap_or(u32::MAX);
                match self.lease.renew(&lease).await {
                    Ok(true) => {}
                    Ok(false) => {
                        report.lease_lost = true;
                        report.unprocessed = unprocessed;
                        tracing::warn!(%campaign_id, unprocessed, "dispatch lease lost, stopping");
                        break 'records;
                    }
                    Err(e) => {
                        report.lease_lost = true;
                        report.unprocessed = unprocessed;
                        tracing::warn!(
                            %campaign_id,
                            unprocessed,
                            error = %e,
                            "could not renew dispatch lease, stopping"
                        );
                        break 'records;
                    }
                }
                let Some(sender) = self.senders.reserve() else {
                    report.quota_exhausted = true;
                    report.unprocessed = unprocessed;
                    tracing::warn!(
                        %campaign_id,
                        unprocessed,
                        "all sender quotas exhausted, stopping dispatch"
                    );
                    break 'records;
                };
                attempted += 1;

                let outcome = match self.attempt(&campaign, plan.record, recipient, &sender).await {
                    Ok(()) => self
                        .mark_participant(plan.record.id, recipient, campaign.id)
                        .await
                        .map_err(|e| AttemptFailure {
                            reason: format!("delivered but not recorded: {e}"),
                            retryable: true,
                        }),
                    Err(failure) => Err(failure),
                };
                let failure = match outcome {
                    Ok(()) => {
                        report.sent += 1;
                        continue;
                    }
                    Err(failure) => failure,
                };
                tracing::warn!(
                    %campaign_id,
                    record_id = %plan.record.id,
                    participant_id = %recipient.participant_id,
                    sender = %sender.id,
                    reason = %failure.reason,
                    retryable = failure.retryable,
                    "delivery failed"
                );
                record_complete = false;
                report.failed.push(DeliveryFailure {
                    record_id: plan.record.id,
                    participant_id: recipient.participant_id,
                    reason: failure.reason,
                    retryable: failure.retryable,
                });
            }
            if record_complete {
                let (ledger, record_id) = (&self.ledger, plan.record.id);
                let marked =
                    retry_with_backoff(&self.store_retry, BackofficeError::is_transient, move || {
                        ledger.mark_sent(record_id, campaign_id)
                    })
                    .await;
                // Every participant is marked; the next run settles the record.
                if let Err(e) = marked {
                    tracing::error!(
                        %campaign_id,
                        %record_id,
                        error = %e,
                        "failed to mark record sent"
                    );
                }
            }
        }

        let failed = i64::try_from(report.failed.len()).unwrap_or(i64::MAX);
        self.campaigns
            .record_progress(campaign.id, i64::from(report.sent), failed)
            .await?;

        tracing::info!(
            %campaign_id,
            sent = report.sent,
            skipped = report.skipped,
            already_delivered = report.already_delivered,
            failed = report.failed.len(),
            quota_exhausted = report.quota_exhausted,
            unprocessed = report.unprocessed,
            lease_lost = report.lease_lost,
            "dispatch finished"
        );
        Ok(report)
    }

    async fn mark_participant(
        &self,
        record_id: Uuid,
        recipient: &Recipient,
        campaign_id: Uuid,
    ) -> Result<(), BackofficeError> {
        let ledger = &self.ledger;
        let participant_id = recipient.participant_id;
        retry_with_backoff(&self.store_retry, BackofficeError::is_transient, move || {
            ledger.mark_participant_sent(record_id, participant_id, campaign_id)
        })
        .await
    }

    /// Resolve recipients per record, counting everything skipped into the report.
    fn plan<'a>(
        &self,
        campaign: &Campaign,
        records: &'a [PurchaseRecord],
        report: &mut DeliveryReport,
    ) -> Vec<RecordPlan<'a>> {
        let mut plans = Vec::with_capacity(records.len());
        for record in records {
            if self.ledger.already_sent(record, campaign.id) {
                report.already_delivered += 1;
                continue;
            }
            let mut seen = HashSet::new();
            let mut recipients = Vec::new();
            for (index, participant) in record.participants.iter().enumerate() {
                let Some(email) = participant
                    .email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                else {
                    report.skipped += 1;
                    continue;
                };
                if !seen.insert(email.to_lowercase()) {
                    tracing::warn!(
                        record_id = %record.id,
                        participant_index = index,
                        "duplicate recipient address in record, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
                if participant.sent_campaigns.contains(&campaign.id) {
                    report.skipped += 1;
                    continue;
                }
                let Ok(index) = u32::try_from(index) else {
                    report.skipped += 1;
                    continue;
                };
                recipients.push(Recipient {
                    index,
                    participant_id: participant.id,
                    name: participant.name.clone(),
                    email: email.to_owned(),
                });
            }
            plans.push(RecordPlan { record, recipients });
        }
        plans
    }

    /// One send attempt. The ticket file, if any, is removed before returning on every path.
    async fn attempt(
        &self,
        campaign: &Campaign,
        record: &PurchaseRecord,
        recipient: &Recipient,
        sender: &SenderIdentity,
    ) -> Result<(), AttemptFailure> {
        let html = render_mail(campaign, &recipient.name);

        let artifact = if campaign.include_credentials {
            let issued = issue_credentials(
                &self.records,
                &self.signer,
                &self.calendar,
                IssueCredentialsInput {
                    record_id: record.id,
                    participant_index: recipient.index,
                    force: false,
                },
            )
            .await
            .map_err(|e| AttemptFailure {
                retryable: e.is_transient(),
                reason: e.to_string(),
            })?;
            let artifact = self
                .renderer
                .render_credential_artifact(&issued.participant_name, &issued.credentials)
                .map_err(|e| AttemptFailure {
                    retryable: false,
                    reason: e.to_string(),
                })?;
            Some(artifact)
        } else {
            None
        };

        let result = {
            let mail = OutgoingMail {
                sender: &sender.id,
                to: &recipient.email,
                subject: &campaign.subject,
                html_body: &html,
                attachments: artifact.iter().map(|a| a.as_attachment()).collect(),
            };
            match tokio::time::timeout(self.send_timeout, self.mail.send(&mail)).await {
                Ok(sent) => sent,
                Err(_) => Err(MailError::Timeout),
            }
        };

        if let Some(artifact) = artifact {
            let path = artifact.path().to_path_buf();
            if let Err(e) = artifact.close() {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove ticket file");
            }
        }

        result.map_err(AttemptFailure::from)
    }
}

/// Interpolate a campaign into [`MAIL_TEMPLATE`].
///
/// The body is trusted HTML and may itself reference `{{name}}`; subject, title and the
/// participant name are escaped.
pub fn render_mail(campaign: &Campaign, participant_name: &str) -> String {
    MAIL_TEMPLATE
        .replace("{{body}}", &campaign.body)
        .replace("{{title}}", &escape_html(&campaign.title))
        .replace("{{subject}}", &escape_html(&campaign.subject))
        .replace("{{name}}", &escape_html(participant_name))
}
