use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catraca_domain::event_day::EventDay;

use crate::domain::repository::AttachmentRenderer;
use crate::error::BackofficeError;
use crate::state::AppState;
use crate::usecase::credential::{IssueCredentialsInput, IssueCredentialsUseCase};

// ── POST /records/{record_id}/participants/{index}/credentials ───────────────

#[derive(Deserialize, Default)]
pub struct IssueCredentialsRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
pub struct CredentialResponse {
    pub day: EventDay,
    pub payload: String,
    pub qr_svg: String,
}

#[derive(Serialize)]
pub struct IssueCredentialsResponse {
    pub record_id: Uuid,
    pub participant_index: u32,
    pub participant_id: Uuid,
    pub participant_name: String,
    pub reissued: bool,
    pub credentials: Vec<CredentialResponse>,
}

pub async fn issue_credentials(
    State(state): State<AppState>,
    Path((record_id, index)): Path<(Uuid, u32)>,
    Json(body): Json<IssueCredentialsRequest>,
) -> Result<Json<IssueCredentialsResponse>, BackofficeError> {
    let usecase = IssueCredentialsUseCase {
        records: state.record_repo(),
        signer: state.signer.clone(),
        calendar: state.calendar.clone(),
    };
    let issued = usecase
        .execute(IssueCredentialsInput {
            record_id,
            participant_index: index,
            force: body.force,
        })
        .await?;

    let credentials = issued
        .credentials
        .into_iter()
        .map(|c| {
            let qr_svg = state
                .renderer
                .render_signed_image(&c.payload)
                .map_err(|e| BackofficeError::Internal(e.into()))?;
            Ok(CredentialResponse {
                day: c.day,
                payload: c.payload,
                qr_svg,
            })
        })
        .collect::<Result<Vec<_>, BackofficeError>>()?;

    Ok(Json(IssueCredentialsResponse {
        record_id: issued.record_id,
        participant_index: issued.participant_index,
        participant_id: issued.participant_id,
        participant_name: issued.participant_name,
        reissued: issued.reissued,
        credentials,
    }))
}
