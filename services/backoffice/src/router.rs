use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use catraca_core::health::healthz;
use catraca_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    campaigns::{create_campaign, dispatch_campaign},
    checkin::checkin,
    credentials::issue_credentials,
    health::readyz,
    records::{change_status, create_record, get_record},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Purchase records
        .route("/records", post(create_record))
        .route("/records/{record_id}", get(get_record))
        .route("/records/{record_id}/status", patch(change_status))
        // Credentials
        .route(
            "/records/{record_id}/participants/{index}/credentials",
            post(issue_credentials),
        )
        .route("/checkin", post(checkin))
        // Campaigns
        .route("/campaigns", post(create_campaign))
        .route("/campaigns/{campaign_id}/dispatch", post(dispatch_campaign))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
