use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catraca_domain::event_day::EventDay;

use crate::error::BackofficeError;
use crate::state::AppState;
use crate::usecase::redeem::RedeemCredentialUseCase;

// ── POST /checkin ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CheckinRequest {
    /// Raw string decoded from the scanned QR code.
    pub payload: String,
}

#[derive(Serialize)]
pub struct CheckinResponse {
    pub valid: bool,
    pub record_id: Uuid,
    pub participant_index: u32,
    pub participant_name: String,
    pub day: EventDay,
}

pub async fn checkin(
    State(state): State<AppState>,
    Json(body): Json<CheckinRequest>,
) -> Result<Json<CheckinResponse>, BackofficeError> {
    let usecase = RedeemCredentialUseCase {
        records: state.record_repo(),
        signer: state.signer.clone(),
        calendar: state.calendar.clone(),
    };
    let output = usecase.execute(&body.payload).await?;
    Ok(Json(CheckinResponse {
        valid: output.valid,
        record_id: output.record_id,
        participant_index: output.participant_index,
        participant_name: output.participant_name,
        day: output.day,
    }))
}
