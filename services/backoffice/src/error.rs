use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Backoffice service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum BackofficeError {
    #[error("malformed credential")]
    MalformedCredential,
    #[error("invalid credential signature")]
    InvalidSignature,
    #[error("stale or unknown credential")]
    StaleOrUnknownCredential,
    #[error("credential already redeemed")]
    AlreadyRedeemed,
    #[error("credentials already redeemed")]
    CredentialsAlreadyRedeemed,
    #[error("record not found")]
    RecordNotFound,
    #[error("participant not found")]
    ParticipantNotFound,
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("invalid status")]
    InvalidStatus,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl BackofficeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedCredential => "MALFORMED_CREDENTIAL",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::StaleOrUnknownCredential => "STALE_OR_UNKNOWN_CREDENTIAL",
            Self::AlreadyRedeemed => "ALREADY_REDEEMED",
            Self::CredentialsAlreadyRedeemed => "CREDENTIALS_ALREADY_REDEEMED",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::ParticipantNotFound => "PARTICIPANT_NOT_FOUND",
            Self::CampaignNotFound => "CAMPAIGN_NOT_FOUND",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Infrastructure failures may succeed on a later attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl IntoResponse for BackofficeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MalformedCredential | Self::InvalidStatus => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::RecordNotFound | Self::ParticipantNotFound | Self::CampaignNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::StaleOrUnknownCredential
            | Self::AlreadyRedeemed
            | Self::CredentialsAlreadyRedeemed => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Integrity failures are logged where they are detected; only 500s are logged here.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Outcome of a failed mail submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("transient mail failure: {0}")]
    Transient(String),
    #[error("mail rejected: {0}")]
    Rejected(String),
    #[error("mail submission timed out")]
    Timeout,
}

impl MailError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Ticket or QR rendering failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("qr encoding failed: {0}")]
    Qr(String),
    #[error("ticket file: {0}")]
    Io(#[from] std::io::Error),
}

/// Payment gateway call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("transient gateway failure: {0}")]
    Transient(String),
    #[error("gateway failure: {0}")]
    Fatal(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
