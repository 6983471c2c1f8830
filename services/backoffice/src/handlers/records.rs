use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

use crate::domain::types::{Participant, PurchaseRecord};
use crate::error::BackofficeError;
use crate::state::AppState;
use crate::usecase::ledger::ChangeRecordStatusUseCase;
use crate::usecase::record::{
    CreateRecordInput, CreateRecordUseCase, GetRecordUseCase, NewParticipant,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RecordResponse {
    pub id: Uuid,
    pub transaction_id: String,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub participants: Vec<Participant>,
    pub metadata: serde_json::Value,
    pub sent_campaigns: BTreeSet<Uuid>,
    pub pending_campaigns: BTreeSet<Uuid>,
    #[serde(serialize_with = "catraca_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "catraca_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PurchaseRecord> for RecordResponse {
    fn from(record: PurchaseRecord) -> Self {
        Self {
            id: record.id,
            transaction_id: record.transaction_id,
            status: record.status,
            payment_method: record.payment_method,
            participants: record.participants,
            metadata: record.metadata,
            sent_campaigns: record.sent_campaigns,
            pending_campaigns: record.pending_campaigns,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

fn parse_status(raw: &str) -> Result<PurchaseStatus, BackofficeError> {
    raw.parse().map_err(|_| BackofficeError::InvalidStatus)
}

// ── POST /records ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ParticipantRequest {
    pub name: String,
    pub email: Option<String>,
    pub document: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRecordRequest {
    pub transaction_id: String,
    pub status: String,
    pub payment_method: PaymentMethod,
    pub participants: Vec<ParticipantRequest>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<RecordResponse>), BackofficeError> {
    let status = parse_status(&body.status)?;
    let usecase = CreateRecordUseCase {
        records: state.record_repo(),
        ledger: state.ledger(),
        campaigns: state.campaign_repo(),
    };
    let record = usecase
        .execute(CreateRecordInput {
            transaction_id: body.transaction_id,
            status,
            payment_method: body.payment_method,
            participants: body
                .participants
                .into_iter()
                .map(|p| NewParticipant {
                    name: p.name,
                    email: p.email,
                    document: p.document,
                })
                .collect(),
            metadata: body.metadata,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

// ── GET /records/{record_id} ─────────────────────────────────────────────────

pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<RecordResponse>, BackofficeError> {
    let usecase = GetRecordUseCase {
        records: state.record_repo(),
    };
    let record = usecase.execute(record_id).await?;
    Ok(Json(record.into()))
}

// ── PATCH /records/{record_id}/status ────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct ChangeStatusResponse {
    pub record_id: Uuid,
    pub previous: PurchaseStatus,
    pub status: PurchaseStatus,
    pub queued_campaigns: Vec<Uuid>,
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<ChangeStatusRequest>,
) -> Result<Json<ChangeStatusResponse>, BackofficeError> {
    let status = parse_status(&body.status)?;
    let usecase = ChangeRecordStatusUseCase {
        records: state.record_repo(),
        ledger: state.ledger(),
        campaigns: state.campaign_repo(),
    };
    let output = usecase.execute(record_id, status).await?;
    Ok(Json(ChangeStatusResponse {
        record_id: output.record_id,
        previous: output.previous,
        status: output.status,
        queued_campaigns: output.queued,
    }))
}
