use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catraca_domain::status::PurchaseStatus;

use crate::error::BackofficeError;
use crate::state::AppState;
use crate::usecase::campaign::{CreateCampaignInput, CreateCampaignUseCase};
use crate::usecase::dispatch::DeliveryReport;

// ── POST /campaigns ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateCampaignRequest {
    pub subject: String,
    pub title: String,
    pub body: String,
    pub status_filter: String,
    #[serde(default)]
    pub include_credentials: bool,
    #[serde(default)]
    pub scheduled: bool,
}

#[derive(Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub subject: String,
    pub title: String,
    pub status_filter: PurchaseStatus,
    pub include_credentials: bool,
    pub scheduled: bool,
    pub sent_count: i64,
    pub failed_count: i64,
    #[serde(serialize_with = "catraca_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_campaign(
    State(state): State<AppState>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), BackofficeError> {
    let status_filter: PurchaseStatus = body
        .status_filter
        .parse()
        .map_err(|_| BackofficeError::InvalidStatus)?;
    let usecase = CreateCampaignUseCase {
        campaigns: state.campaign_repo(),
        records: state.record_repo(),
        ledger: state.ledger(),
    };
    let campaign = usecase
        .execute(CreateCampaignInput {
            subject: body.subject,
            title: body.title,
            body: body.body,
            status_filter,
            include_credentials: body.include_credentials,
            scheduled: body.scheduled,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CampaignResponse {
            id: campaign.id,
            subject: campaign.subject,
            title: campaign.title,
            status_filter: campaign.status_filter,
            include_credentials: campaign.include_credentials,
            scheduled: campaign.scheduled,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            created_at: campaign.created_at,
        }),
    ))
}

// ── POST /campaigns/{campaign_id}/dispatch ───────────────────────────────────

pub async fn dispatch_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<DeliveryReport>, BackofficeError> {
    let report = state.dispatch().execute(campaign_id).await?;
    Ok(Json(report))
}
