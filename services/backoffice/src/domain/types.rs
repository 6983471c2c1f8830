use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use catraca_domain::event_day::{EventCalendar, EventDay};
use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

/// One registrant embedded in a purchase record (stored inside the record document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable id assigned at record creation. Credentials still address participants by
    /// position; the id guards writes against a reordered list.
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub document: Option<String>,
    /// Event day → canonical credential payload.
    #[serde(default)]
    pub credentials: BTreeMap<EventDay, String>,
    /// Event day → redeemed flag.
    #[serde(default)]
    pub redemption_state: BTreeMap<EventDay, bool>,
    /// Campaigns already delivered to this participant.
    #[serde(default)]
    pub sent_campaigns: BTreeSet<Uuid>,
}

impl Participant {
    pub fn new(name: String, email: Option<String>, document: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            document,
            credentials: BTreeMap::new(),
            redemption_state: BTreeMap::new(),
            sent_campaigns: BTreeSet::new(),
        }
    }

    pub fn has_credentials_for(&self, calendar: &EventCalendar) -> bool {
        calendar
            .days()
            .iter()
            .all(|day| self.credentials.contains_key(day))
    }

    pub fn any_redeemed(&self) -> bool {
        self.redemption_state.values().any(|redeemed| *redeemed)
    }

    pub fn is_redeemed(&self, day: &EventDay) -> bool {
        self.redemption_state.get(day).copied().unwrap_or(false)
    }
}

/// A persisted ticket transaction with its participants and notification bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub transaction_id: String,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub participants: Vec<Participant>,
    pub metadata: serde_json::Value,
    pub sent_campaigns: BTreeSet<Uuid>,
    pub pending_campaigns: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRecord {
    pub fn participant(&self, index: u32) -> Option<&Participant> {
        self.participants.get(index as usize)
    }

    pub fn already_sent(&self, campaign_id: Uuid) -> bool {
        self.sent_campaigns.contains(&campaign_id)
    }
}

/// Signed, self-contained proof that one participant may enter on one event day.
///
/// The serialized form is the canonical transport payload encoded in the QR code; field
/// order is fixed by declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    pub record_id: Uuid,
    pub participant_index: u32,
    pub participant_name: String,
    pub event_name: String,
    pub day: EventDay,
    /// Unique per issuance; distinguishes a superseded payload from the current one.
    pub serial: Uuid,
    pub signature: String,
}

impl Credential {
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// A credential as handed to callers: the day plus its canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCredential {
    pub day: EventDay,
    pub payload: String,
}

/// Result of an issuance call.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub record_id: Uuid,
    pub participant_index: u32,
    pub participant_id: Uuid,
    pub participant_name: String,
    pub credentials: Vec<IssuedCredential>,
    /// `false` when existing credentials were returned unchanged.
    pub reissued: bool,
}

/// Atomic write of a participant's freshly issued credentials.
#[derive(Debug, Clone)]
pub struct CredentialWrite {
    pub record_id: Uuid,
    pub participant_index: u32,
    /// Write is rejected if the participant at `participant_index` has a different id.
    pub participant_id: Uuid,
    pub credentials: BTreeMap<EventDay, String>,
    /// Replace whatever is stored, redeemed days included.
    pub force: bool,
}

/// What the store did with a [`CredentialWrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialWriteOutcome {
    /// The new payloads replaced the stored set and every redemption flag was reset.
    Written,
    /// The participant already held a payload for every day; nothing was written.
    Existing(BTreeMap<EventDay, String>),
    /// The stored set is incomplete and one of its days was redeemed; nothing was written.
    AlreadyRedeemed,
    /// The record is gone or another participant sits at that index.
    ParticipantMissing,
}

impl CredentialWrite {
    /// Apply the re-issue policy to `participant`. Callers hold the record lock.
    pub fn apply_to(&self, participant: &mut Participant) -> CredentialWriteOutcome {
        if participant.id != self.participant_id {
            return CredentialWriteOutcome::ParticipantMissing;
        }
        if !self.force {
            let existing: BTreeMap<EventDay, String> = self
                .credentials
                .keys()
                .filter_map(|day| participant.credentials.get(day).map(|p| (*day, p.clone())))
                .collect();
            if existing.len() == self.credentials.len() {
                return CredentialWriteOutcome::Existing(existing);
            }
            if participant.any_redeemed() {
                return CredentialWriteOutcome::AlreadyRedeemed;
            }
        }
        participant.redemption_state = self.credentials.keys().map(|day| (*day, false)).collect();
        participant.credentials = self.credentials.clone();
        CredentialWriteOutcome::Written
    }
}

/// Result of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated { previous: PurchaseStatus },
    /// The record no longer had the expected status; nothing was written.
    Superseded { current: PurchaseStatus },
    NotFound,
}

/// Input to the atomic redeem step (load, compare, check, set, log).
#[derive(Debug, Clone)]
pub struct RedemptionRequest {
    pub record_id: Uuid,
    pub participant_index: u32,
    pub day: EventDay,
    pub payload: String,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed {
        participant_id: Uuid,
        participant_name: String,
    },
    RecordNotFound,
    ParticipantNotFound,
    Stale,
    AlreadyRedeemed,
}

/// Audit entry written with each successful redemption.
#[derive(Debug, Clone)]
pub struct RedemptionLog {
    pub id: Uuid,
    pub record_id: Uuid,
    pub participant_id: Uuid,
    pub participant_index: u32,
    pub day: EventDay,
    pub redeemed_at: DateTime<Utc>,
}

/// A notification template bound to a status targeting rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: Uuid,
    pub subject: String,
    pub title: String,
    /// HTML fragment interpolated into the mail template.
    pub body: String,
    pub status_filter: PurchaseStatus,
    pub include_credentials: bool,
    pub scheduled: bool,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One file attached to an outgoing mail.
#[derive(Debug, Clone)]
pub struct MailAttachment<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub path: &'a Path,
}

/// A fully rendered mail ready for the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail<'a> {
    pub sender: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub html_body: &'a str,
    pub attachments: Vec<MailAttachment<'a>>,
}

/// Printable ticket written to a transient file.
///
/// The file is owned by exactly one send attempt and is deleted when the artifact is
/// closed or dropped, whichever comes first.
#[derive(Debug)]
pub struct TicketArtifact {
    pub filename: String,
    pub content_type: String,
    pub file: NamedTempFile,
}

impl TicketArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn as_attachment(&self) -> MailAttachment<'_> {
        MailAttachment {
            filename: &self.filename,
            content_type: &self.content_type,
            path: self.file.path(),
        }
    }

    /// Delete the backing file, surfacing any filesystem error.
    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}
