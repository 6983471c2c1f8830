use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use catraca_backoffice::config::BackofficeConfig;
use catraca_backoffice::domain::sender::SenderPool;
use catraca_backoffice::infra::lease::{AppLease, LocalDispatchLease, RedisDispatchLease};
use catraca_backoffice::infra::mail::SmtpMailTransport;
use catraca_backoffice::infra::payment::HttpPaymentGateway;
use catraca_backoffice::infra::ticket::HtmlTicketRenderer;
use catraca_backoffice::router::build_router;
use catraca_backoffice::scheduler;
use catraca_backoffice::state::AppState;
use catraca_backoffice::usecase::signature::SignatureEngine;
use catraca_core::config::Config;
use catraca_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = BackofficeConfig::from_env();

    let signer = SignatureEngine::new(&config.credential_secret).expect("CREDENTIAL_SECRET");
    let calendar = config.calendar().expect("invalid EVENT_DAYS");
    let accounts = config.mail_accounts().expect("invalid MAIL_ACCOUNTS");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let lease = match &config.redis_url {
        Some(url) => {
            let pool = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .expect("failed to create Redis pool");
            AppLease::Redis(RedisDispatchLease {
                pool,
                ttl: config.dispatch_lease_ttl(),
            })
        }
        None => AppLease::Local(LocalDispatchLease::new()),
    };

    let mail = SmtpMailTransport::new(
        &config.smtp_host,
        config.smtp_port,
        &accounts,
        config.mail_timeout(),
    )
    .expect("failed to configure SMTP transport");

    let gateway = HttpPaymentGateway::new(
        &config.payment_gateway_url,
        &config.payment_gateway_token,
        config.payment_timeout(),
    )
    .expect("failed to build payment gateway client");

    let senders = SenderPool::new(
        accounts.iter().map(|a| a.address.clone()),
        config.mail_daily_quota,
    );

    let state = AppState {
        db,
        signer: Arc::new(signer),
        calendar: Arc::new(calendar),
        senders: Arc::new(senders),
        mail,
        renderer: HtmlTicketRenderer {
            dir: config.ticket_dir.clone(),
        },
        lease,
        gateway,
        mail_timeout: config.mail_timeout(),
        payment_timeout: config.payment_timeout(),
    };

    scheduler::spawn(
        state.clone(),
        config.dispatch_interval(),
        config.resync_interval(),
    );

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.backoffice_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(
        senders = accounts.len(),
        redis_lease = config.redis_url.is_some(),
        "backoffice service listening on {addr}"
    );
    axum::serve(listener, router).await.expect("server error");
}
