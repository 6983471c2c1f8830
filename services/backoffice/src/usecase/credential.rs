use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use uuid::Uuid;

use catraca_domain::event_day::{EventCalendar, EventDay};

use crate::domain::repository::PurchaseRecordRepository;
use crate::domain::types::{
    Credential, CredentialWrite, CredentialWriteOutcome, IssuedCredential, IssuedCredentials,
    Participant,
};
use crate::error::BackofficeError;
use crate::usecase::signature::SignatureEngine;

pub struct IssueCredentialsInput {
    pub record_id: Uuid,
    pub participant_index: u32,
    /// Regenerate even if the participant already holds (possibly redeemed) credentials.
    pub force: bool,
}

pub struct IssueCredentialsUseCase<R: PurchaseRecordRepository> {
    pub records: R,
    pub signer: Arc<SignatureEngine>,
    pub calendar: Arc<EventCalendar>,
}

impl<R: PurchaseRecordRepository> IssueCredentialsUseCase<R> {
    pub async fn execute(
        &self,
        input: IssueCredentialsInput,
    ) -> Result<IssuedCredentials, BackofficeError> {
        issue_credentials(&self.records, &self.signer, &self.calendar, input).await
    }
}

/// Issue one credential per calendar day for a participant.
///
/// Without `force`, a participant that already holds credentials for every day gets them back
/// unchanged, and an incomplete set with a redeemed day is refused. With `force`, a new serial
/// supersedes every stored payload and all redemption flags reset.
pub async fn issue_credentials<R: PurchaseRecordRepository>(
    records: &R,
    signer: &SignatureEngine,
    calendar: &EventCalendar,
    input: IssueCredentialsInput,
) -> Result<IssuedCredentials, BackofficeError> {
    let record = records
        .find_by_id(input.record_id)
        .await?
        .ok_or(BackofficeError::RecordNotFound)?;
    let participant = record
        .participant(input.participant_index)
        .ok_or(BackofficeError::ParticipantNotFound)?;

    // Complete sets only change under force.
    if !input.force && participant.has_credentials_for(calendar) {
        let stored = &participant.credentials;
        return Ok(existing(record.id, input.participant_index, participant, calendar, stored));
    }

    let serial = Uuid::new_v4();
    let mut issued = Vec::with_capacity(calendar.days().len());
    let mut payloads = BTreeMap::new();
    for day in calendar.days() {
        let credential = Credential {
            record_id: record.id,
            participant_index: input.participant_index,
            participant_name: participant.name.clone(),
            event_name: calendar.event_name().to_owned(),
            day: *day,
            serial,
            signature: signer.sign(record.id, input.participant_index, day),
        };
        let payload = credential.to_payload().context("serialize credential")?;
        payloads.insert(*day, payload.clone());
        issued.push(IssuedCredential { day: *day, payload });
    }

    let write = CredentialWrite {
        record_id: record.id,
        participant_index: input.participant_index,
        participant_id: participant.id,
        credentials: payloads,
        force: input.force,
    };
    match records.store_credentials(&write).await? {
        CredentialWriteOutcome::Written => {}
        CredentialWriteOutcome::Existing(stored) => {
            // Another issuance completed the set first.
            let index = input.participant_index;
            return Ok(existing(record.id, index, participant, calendar, &stored));
        }
        CredentialWriteOutcome::AlreadyRedeemed => {
            return Err(BackofficeError::CredentialsAlreadyRedeemed);
        }
        CredentialWriteOutcome::ParticipantMissing => {
            return Err(BackofficeError::ParticipantNotFound);
        }
    }

    tracing::info!(
        record_id = %record.id,
        participant_index = input.participant_index,
        participant_id = %participant.id,
        days = issued.len(),
        forced = input.force,
        "credentials issued"
    );

    Ok(IssuedCredentials {
        record_id: record.id,
        participant_index: input.participant_index,
        participant_id: participant.id,
        participant_name: participant.name.clone(),
        credentials: issued,
        reissued: true,
    })
}

fn existing(
    record_id: Uuid,
    participant_index: u32,
    participant: &Participant,
    calendar: &EventCalendar,
    stored: &BTreeMap<EventDay, String>,
) -> IssuedCredentials {
    let credentials = calendar
        .days()
        .iter()
        .filter_map(|day| {
            stored.get(day).map(|payload| IssuedCredential {
                day: *day,
                payload: payload.clone(),
            })
        })
        .collect();
    IssuedCredentials {
        record_id,
        participant_index,
        participant_id: participant.id,
        participant_name: participant.name.clone(),
        credentials,
        reissued: false,
    }
}
