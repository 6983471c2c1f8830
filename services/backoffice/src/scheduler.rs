use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::domain::repository::{
    AttachmentRenderer, CampaignRepository, DispatchLease, MailTransport, NotificationLedger,
    PurchaseRecordRepository,
};
use crate::state::AppState;
use crate::usecase::dispatch::{DeliveryReport, DispatchCampaignUseCase};

/// Start the periodic dispatch and resync tasks. Ticks that fall behind are skipped
/// rather than bunched up.
pub fn spawn(
    state: AppState,
    dispatch_every: Duration,
    resync_every: Duration,
) -> Vec<JoinHandle<()>> {
    let dispatch_state = state.clone();
    let dispatch = tokio::spawn(async move {
        let mut ticker = interval(dispatch_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let campaigns = dispatch_state.campaign_repo();
            let usecase = dispatch_state.dispatch();
            run_scheduled_dispatch(&campaigns, &usecase).await;
        }
    });

    let resync = tokio::spawn(async move {
        let mut ticker = interval(resync_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = state.resync().execute().await {
                tracing::error!(error = %e, "scheduled payment resync failed");
            }
        }
    });

    vec![dispatch, resync]
}

/// Dispatch every scheduled campaign in creation order. Stops early when another worker
/// holds or takes over the lease, or the sender pool is exhausted.
pub async fn run_scheduled_dispatch<S, R, L, C, M, A, K>(
    scheduled: &S,
    dispatch: &DispatchCampaignUseCase<R, L, C, M, A, K>,
) -> Vec<DeliveryReport>
where
    S: CampaignRepository,
    R: PurchaseRecordRepository,
    L: NotificationLedger,
    C: CampaignRepository,
    M: MailTransport,
    A: AttachmentRenderer,
    K: DispatchLease,
{
    let campaigns = match scheduled.list_scheduled().await {
        Ok(campaigns) => campaigns,
        Err(e) => {
            tracing::error!(error = %e, "failed to list scheduled campaigns");
            return Vec::new();
        }
    };

    let mut reports = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        match dispatch.execute(campaign.id).await {
            Ok(report) => {
                let stop = report.already_running || report.lease_lost || report.quota_exhausted;
                reports.push(report);
                if stop {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(campaign_id = %campaign.id, error = %e, "scheduled dispatch failed");
            }
        }
    }
    reports
}
