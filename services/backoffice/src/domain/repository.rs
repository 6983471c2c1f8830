#![allow(async_fn_in_trait)]

use uuid::Uuid;

use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

use crate::domain::types::{
    Campaign, CredentialWrite, CredentialWriteOutcome, IssuedCredential, OutgoingMail,
    PurchaseRecord, RedeemOutcome, RedemptionRequest, StatusUpdate, TicketArtifact,
};
use crate::error::{BackofficeError, GatewayError, MailError, RenderError};

/// Document store for purchase records and their embedded participants.
pub trait PurchaseRecordRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PurchaseRecord>, BackofficeError>;

    async fn list_by_status(
        &self,
        status: PurchaseStatus,
    ) -> Result<Vec<PurchaseRecord>, BackofficeError>;

    async fn insert(&self, record: &PurchaseRecord) -> Result<(), BackofficeError>;

    /// Lock the record and apply [`CredentialWrite::apply_to`] to the participant at
    /// `write.participant_index`. The completeness and redemption checks run under the same
    /// lock as the write.
    async fn store_credentials(
        &self,
        write: &CredentialWrite,
    ) -> Result<CredentialWriteOutcome, BackofficeError>;

    /// Atomic conditional redeem: load the participant, byte-compare the stored payload,
    /// refuse if already redeemed, otherwise set the flag and write a redemption log entry.
    /// Must behave as a single compare-and-set with respect to concurrent callers.
    async fn redeem(&self, request: &RedemptionRequest) -> Result<RedeemOutcome, BackofficeError>;

    /// Set a record's status. With `expected`, the write only happens while the record still
    /// has that status.
    async fn update_status(
        &self,
        id: Uuid,
        expected: Option<PurchaseStatus>,
        status: PurchaseStatus,
    ) -> Result<StatusUpdate, BackofficeError>;
}

/// Per-record delivery bookkeeping. Every mutation is idempotent.
pub trait NotificationLedger: Send + Sync {
    /// Membership test against the record's delivered campaigns.
    fn already_sent(&self, record: &PurchaseRecord, campaign_id: Uuid) -> bool {
        record.already_sent(campaign_id)
    }

    /// Add to sent, remove from pending. A second call is a no-op.
    async fn mark_sent(&self, record_id: Uuid, campaign_id: Uuid) -> Result<(), BackofficeError>;

    /// Record delivery to one participant of a multi-participant record.
    async fn mark_participant_sent(
        &self,
        record_id: Uuid,
        participant_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<(), BackofficeError>;

    /// Add to pending unless the campaign was already delivered.
    async fn queue(&self, record_id: Uuid, campaign_id: Uuid) -> Result<(), BackofficeError>;

    /// Drop every pending entry.
    async fn dequeue_all(&self, record_id: Uuid) -> Result<(), BackofficeError>;
}

/// Operator-created campaigns.
pub trait CampaignRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, BackofficeError>;

    async fn insert(&self, campaign: &Campaign) -> Result<(), BackofficeError>;

    async fn list_by_status_filter(
        &self,
        status: PurchaseStatus,
    ) -> Result<Vec<Campaign>, BackofficeError>;

    async fn list_scheduled(&self) -> Result<Vec<Campaign>, BackofficeError>;

    /// Add to the campaign's progress counters.
    async fn record_progress(
        &self,
        id: Uuid,
        sent: i64,
        failed: i64,
    ) -> Result<(), BackofficeError>;
}

/// Outbound mail submission.
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail<'_>) -> Result<(), MailError>;
}

/// Ticket and QR rendering. Both operations are pure functions of their inputs.
pub trait AttachmentRenderer: Send + Sync {
    /// SVG QR encoding of one credential payload.
    fn render_signed_image(&self, payload: &str) -> Result<String, RenderError>;

    /// Printable ticket for one participant, written to a transient file.
    fn render_credential_artifact(
        &self,
        participant_name: &str,
        credentials: &[IssuedCredential],
    ) -> Result<TicketArtifact, RenderError>;
}

/// Payment gateway status lookup.
pub trait PaymentGateway: Send + Sync {
    /// Raw gateway status string for one transaction.
    async fn fetch_status(
        &self,
        transaction_id: &str,
        method: &PaymentMethod,
    ) -> Result<String, GatewayError>;
}

/// Process-wide single-worker lease guarding dispatch.
///
/// The guard releases the lease when dropped, so every exit path of the holder releases it.
pub trait DispatchLease: Send + Sync {
    type Guard: Send;

    /// Returns `None` if another worker holds the lease.
    async fn try_acquire(&self) -> Result<Option<Self::Guard>, BackofficeError>;

    /// Push the expiry of a held lease out by a full TTL. `false` means the lease expired
    /// and may now belong to another worker.
    async fn renew(&self, guard: &Self::Guard) -> Result<bool, BackofficeError>;
}
