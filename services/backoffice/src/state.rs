use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use catraca_core::retry::RetryPolicy;
use catraca_domain::event_day::EventCalendar;

use crate::domain::sender::SenderPool;
use crate::infra::db::{DbCampaignRepository, DbNotificationLedger, DbPurchaseRecordRepository};
use crate::infra::lease::AppLease;
use crate::infra::mail::SmtpMailTransport;
use crate::infra::payment::HttpPaymentGateway;
use crate::infra::ticket::HtmlTicketRenderer;
use crate::usecase::dispatch::DispatchCampaignUseCase;
use crate::usecase::resync::ResyncPendingPaymentsUseCase;
use crate::usecase::signature::SignatureEngine;

pub type AppDispatch = DispatchCampaignUseCase<
    DbPurchaseRecordRepository,
    DbNotificationLedger,
    DbCampaignRepository,
    SmtpMailTransport,
    HtmlTicketRenderer,
    AppLease,
>;

pub type AppResync = ResyncPendingPaymentsUseCase<
    DbPurchaseRecordRepository,
    DbNotificationLedger,
    DbCampaignRepository,
    HttpPaymentGateway,
>;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub signer: Arc<SignatureEngine>,
    pub calendar: Arc<EventCalendar>,
    pub senders: Arc<SenderPool>,
    pub mail: SmtpMailTransport,
    pub renderer: HtmlTicketRenderer,
    pub lease: AppLease,
    pub gateway: HttpPaymentGateway,
    pub mail_timeout: Duration,
    pub payment_timeout: Duration,
}

impl AppState {
    pub fn record_repo(&self) -> DbPurchaseRecordRepository {
        DbPurchaseRecordRepository {
            db: self.db.clone(),
        }
    }

    pub fn ledger(&self) -> DbNotificationLedger {
        DbNotificationLedger {
            db: self.db.clone(),
        }
    }

    pub fn campaign_repo(&self) -> DbCampaignRepository {
        DbCampaignRepository {
            db: self.db.clone(),
        }
    }

    pub fn dispatch(&self) -> AppDispatch {
        DispatchCampaignUseCase {
            records: self.record_repo(),
            ledger: self.ledger(),
            campaigns: self.campaign_repo(),
            mail: self.mail.clone(),
            renderer: self.renderer.clone(),
            lease: self.lease.clone(),
            senders: Arc::clone(&self.senders),
            signer: Arc::clone(&self.signer),
            calendar: Arc::clone(&self.calendar),
            send_timeout: self.mail_timeout,
            store_retry: RetryPolicy::default(),
        }
    }

    pub fn resync(&self) -> AppResync {
        ResyncPendingPaymentsUseCase {
            records: self.record_repo(),
            ledger: self.ledger(),
            campaigns: self.campaign_repo(),
            gateway: self.gateway.clone(),
            retry: RetryPolicy::default(),
            call_timeout: self.payment_timeout,
        }
    }
}
