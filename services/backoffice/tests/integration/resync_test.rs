use std::time::Duration;

use uuid::Uuid;

use catraca_backoffice::domain::repository::PaymentGateway;
use catraca_backoffice::error::GatewayError;
use catraca_backoffice::usecase::resync::ResyncPendingPaymentsUseCase;
use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

use crate::helpers::{
    InMemoryStore, ScriptedGateway, fast_retry, test_campaign, test_participant, test_record,
};

fn usecase(
    store: &InMemoryStore,
    gateway: &ScriptedGateway,
) -> ResyncPendingPaymentsUseCase<InMemoryStore, InMemoryStore, InMemoryStore, ScriptedGateway> {
    ResyncPendingPaymentsUseCase {
        records: store.clone(),
        ledger: store.clone(),
        campaigns: store.clone(),
        gateway: gateway.clone(),
        retry: fast_retry(),
        call_timeout: Duration::from_secs(5),
    }
}

/// Seed pending records and return their (id, transaction id) pairs.
fn pending_records(store: &InMemoryStore, count: usize) -> Vec<(Uuid, String)> {
    (0..count)
        .map(|i| {
            let record = test_record(
                PurchaseStatus::Pending,
                vec![test_participant(&format!("Guest {i}"), None)],
            );
            let ids = (record.id, record.transaction_id.clone());
            store.records.lock().unwrap().push(record);
            ids
        })
        .collect()
}

#[tokio::test]
async fn should_retry_transient_gateway_failure_then_transition() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 1);
    let (record_id, tx) = &seeded[0];
    let welcome = test_campaign(PurchaseStatus::Approved, true);
    store.add_campaign(welcome.clone());
    let gateway = ScriptedGateway::default().reply(
        tx,
        vec![
            Err(GatewayError::Transient("503".to_owned())),
            Err(GatewayError::Transient("503".to_owned())),
            Ok("PAID".to_owned()),
        ],
    );

    let report = usecase(&store, &gateway).execute().await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.transitioned, 1);
    assert!(report.errors.is_empty());
    assert_eq!(gateway.calls_for(tx), 3);

    let record = store.record(*record_id);
    assert_eq!(record.status, PurchaseStatus::Approved);
    assert!(record.pending_campaigns.contains(&welcome.id));
}

#[tokio::test]
async fn should_isolate_failing_record_from_the_rest() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 3);
    let gateway = ScriptedGateway::default()
        .reply(&seeded[0].1, vec![Ok("approved".to_owned())])
        .reply(
            &seeded[1].1,
            vec![Err(GatewayError::Fatal("404 not found".to_owned()))],
        )
        .reply(&seeded[2].1, vec![Ok("refused".to_owned())]);

    let report = usecase(&store, &gateway).execute().await.unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.transitioned, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].record_id, seeded[1].0);
    assert!(report.errors[0].reason.contains("404"));
    assert_eq!(gateway.calls_for(&seeded[1].1), 1, "fatal errors are not retried");

    assert_eq!(store.record(seeded[0].0).status, PurchaseStatus::Approved);
    assert_eq!(store.record(seeded[1].0).status, PurchaseStatus::Pending);
    assert_eq!(store.record(seeded[2].0).status, PurchaseStatus::Error);
}

#[tokio::test]
async fn should_report_error_once_retries_are_exhausted() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 1);
    let gateway = ScriptedGateway::default().reply(
        &seeded[0].1,
        vec![Err(GatewayError::Transient("connection reset".to_owned()))],
    );

    let report = usecase(&store, &gateway).execute().await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(gateway.calls_for(&seeded[0].1), 4, "first attempt plus three retries");
    assert_eq!(store.record(seeded[0].0).status, PurchaseStatus::Pending);
}

#[tokio::test]
async fn should_leave_record_unchanged_for_unrecognised_or_same_status() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 2);
    let gateway = ScriptedGateway::default()
        .reply(&seeded[0].1, vec![Ok("chargeback".to_owned())])
        .reply(&seeded[1].1, vec![Ok("waiting_payment".to_owned())]);

    let report = usecase(&store, &gateway).execute().await.unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.unchanged, 2);
    assert_eq!(report.transitioned, 0);
    assert!(report.errors.is_empty());
    for (id, _) in &seeded {
        assert_eq!(store.record(*id).status, PurchaseStatus::Pending);
    }
}

#[tokio::test]
async fn should_only_check_pending_records() {
    let store = InMemoryStore::default();
    store.records.lock().unwrap().push(test_record(
        PurchaseStatus::Approved,
        vec![test_participant("Ana", None)],
    ));
    let gateway = ScriptedGateway::default();

    let report = usecase(&store, &gateway).execute().await.unwrap();

    assert_eq!(report.checked, 0);
    assert!(gateway.calls.lock().unwrap().is_empty());
}

struct SlowGateway;

impl PaymentGateway for SlowGateway {
    async fn fetch_status(
        &self,
        _transaction_id: &str,
        _method: &PaymentMethod,
    ) -> Result<String, GatewayError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("approved".to_owned())
    }
}

#[tokio::test(start_paused = true)]
async fn should_treat_slow_gateway_as_transient() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 1);
    let gateway = SlowGateway;

    let report = ResyncPendingPaymentsUseCase {
        records: store.clone(),
        ledger: store.clone(),
        campaigns: store.clone(),
        gateway,
        retry: fast_retry(),
        call_timeout: Duration::from_secs(1),
    }
    .execute()
    .await
    .unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].reason.contains("timed out"));
    assert_eq!(store.record(seeded[0].0).status, PurchaseStatus::Pending);
}

/// Approves the record by hand while the gateway call is in flight, then reports a refusal.
struct ApprovedDuringCall {
    store: InMemoryStore,
    record_id: Uuid,
}

impl PaymentGateway for ApprovedDuringCall {
    async fn fetch_status(
        &self,
        _transaction_id: &str,
        _method: &PaymentMethod,
    ) -> Result<String, GatewayError> {
        let mut records = self.store.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == self.record_id) {
            record.status = PurchaseStatus::Approved;
        }
        Ok("refused".to_owned())
    }
}

#[tokio::test]
async fn should_not_overwrite_status_changed_during_gateway_call() {
    let store = InMemoryStore::default();
    let seeded = pending_records(&store, 1);
    let record_id = seeded[0].0;
    let declined = test_campaign(PurchaseStatus::Error, false);
    store.add_campaign(declined.clone());

    let report = ResyncPendingPaymentsUseCase {
        records: store.clone(),
        ledger: store.clone(),
        campaigns: store.clone(),
        gateway: ApprovedDuringCall {
            store: store.clone(),
            record_id,
        },
        retry: fast_retry(),
        call_timeout: Duration::from_secs(5),
    }
    .execute()
    .await
    .unwrap();

    assert_eq!(report.transitioned, 0);
    assert_eq!(report.unchanged, 1);
    assert!(report.errors.is_empty());
    let record = store.record(record_id);
    assert_eq!(record.status, PurchaseStatus::Approved);
    assert!(!record.pending_campaigns.contains(&declined.id));
}
