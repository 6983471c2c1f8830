use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use catraca_domain::event_day::{EventCalendar, EventDay};

use crate::domain::repository::PurchaseRecordRepository;
use crate::domain::types::{Credential, RedeemOutcome, RedemptionRequest};
use crate::error::BackofficeError;
use crate::usecase::signature::SignatureEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemOutput {
    pub valid: bool,
    pub record_id: Uuid,
    pub participant_index: u32,
    pub participant_name: String,
    pub day: EventDay,
}

pub struct RedeemCredentialUseCase<R: PurchaseRecordRepository> {
    pub records: R,
    pub signer: Arc<SignatureEngine>,
    pub calendar: Arc<EventCalendar>,
}

impl<R: PurchaseRecordRepository> RedeemCredentialUseCase<R> {
    /// Consume a scanned credential: parse, verify, then the atomic
    /// compare-and-set on the stored payload and redemption flag.
    pub async fn execute(&self, scanned: &str) -> Result<RedeemOutput, BackofficeError> {
        let credential = Credential::parse(scanned).map_err(|e| {
            tracing::warn!(target: "security", error = %e, "malformed credential scanned");
            BackofficeError::MalformedCredential
        })?;

        if !self.signer.verify(
            credential.record_id,
            credential.participant_index,
            &credential.day,
            &credential.signature,
        ) {
            tracing::warn!(
                target: "security",
                record_id = %credential.record_id,
                participant_index = credential.participant_index,
                day = %credential.day,
                "credential signature mismatch"
            );
            return Err(BackofficeError::InvalidSignature);
        }

        if !self.calendar.contains(&credential.day) {
            tracing::warn!(
                target: "security",
                record_id = %credential.record_id,
                day = %credential.day,
                "credential for a day outside the event calendar"
            );
            return Err(BackofficeError::StaleOrUnknownCredential);
        }

        let request = RedemptionRequest {
            record_id: credential.record_id,
            participant_index: credential.participant_index,
            day: credential.day,
            payload: scanned.to_owned(),
            redeemed_at: Utc::now(),
        };

        match self.records.redeem(&request).await? {
            RedeemOutcome::Redeemed {
                participant_id,
                participant_name,
            } => {
                tracing::info!(
                    record_id = %credential.record_id,
                    participant_id = %participant_id,
                    day = %credential.day,
                    "credential redeemed"
                );
                Ok(RedeemOutput {
                    valid: true,
                    record_id: credential.record_id,
                    participant_index: credential.participant_index,
                    participant_name,
                    day: credential.day,
                })
            }
            RedeemOutcome::RecordNotFound => Err(BackofficeError::RecordNotFound),
            RedeemOutcome::ParticipantNotFound => Err(BackofficeError::ParticipantNotFound),
            RedeemOutcome::Stale => {
                tracing::warn!(
                    target: "security",
                    record_id = %credential.record_id,
                    participant_index = credential.participant_index,
                    day = %credential.day,
                    "stale or unknown credential presented"
                );
                Err(BackofficeError::StaleOrUnknownCredential)
            }
            RedeemOutcome::AlreadyRedeemed => {
                tracing::warn!(
                    target: "security",
                    record_id = %credential.record_id,
                    participant_index = credential.participant_index,
                    day = %credential.day,
                    "credential replayed after redemption"
                );
                Err(BackofficeError::AlreadyRedeemed)
            }
        }
    }
}
