use uuid::Uuid;

use catraca_backoffice::domain::repository::NotificationLedger;
use catraca_backoffice::error::BackofficeError;
use catraca_backoffice::usecase::campaign::{CreateCampaignInput, CreateCampaignUseCase};
use catraca_backoffice::usecase::ledger::ChangeRecordStatusUseCase;
use catraca_backoffice::usecase::record::{
    CreateRecordInput, CreateRecordUseCase, GetRecordUseCase, NewParticipant,
};
use catraca_domain::payment::PaymentMethod;
use catraca_domain::status::PurchaseStatus;

use crate::helpers::{InMemoryStore, test_campaign, test_participant, test_record};

fn change_status_usecase(
    store: &InMemoryStore,
) -> ChangeRecordStatusUseCase<InMemoryStore, InMemoryStore, InMemoryStore> {
    ChangeRecordStatusUseCase {
        records: store.clone(),
        ledger: store.clone(),
        campaigns: store.clone(),
    }
}

fn pending_record(store: &InMemoryStore) -> Uuid {
    let record = test_record(
        PurchaseStatus::Pending,
        vec![test_participant("Ana", Some("ana@example.com"))],
    );
    let id = record.id;
    store.records.lock().unwrap().push(record);
    id
}

// ── ChangeRecordStatusUseCase ────────────────────────────────────────────────

#[tokio::test]
async fn should_retarget_pending_campaigns_on_status_change() {
    let store = InMemoryStore::default();
    let record_id = pending_record(&store);
    let reminder = test_campaign(PurchaseStatus::Pending, false);
    let welcome = test_campaign(PurchaseStatus::Approved, true);
    store.add_campaign(reminder.clone());
    store.add_campaign(welcome.clone());
    store.queue(record_id, reminder.id).await.unwrap();

    let output = change_status_usecase(&store)
        .execute(record_id, PurchaseStatus::Approved)
        .await
        .unwrap();

    assert_eq!(output.previous, PurchaseStatus::Pending);
    assert_eq!(output.status, PurchaseStatus::Approved);
    assert_eq!(output.queued, [welcome.id]);

    let record = store.record(record_id);
    assert_eq!(record.status, PurchaseStatus::Approved);
    assert_eq!(record.pending_campaigns.len(), 1);
    assert!(record.pending_campaigns.contains(&welcome.id));
}

#[tokio::test]
async fn should_not_queue_campaign_already_delivered() {
    let store = InMemoryStore::default();
    let record_id = pending_record(&store);
    let welcome = test_campaign(PurchaseStatus::Approved, false);
    store.add_campaign(welcome.clone());
    store.mark_sent(record_id, welcome.id).await.unwrap();

    let output = change_status_usecase(&store)
        .execute(record_id, PurchaseStatus::Approved)
        .await
        .unwrap();

    assert!(output.queued.is_empty());
    let record = store.record(record_id);
    assert!(record.pending_campaigns.is_empty());
    assert!(record.sent_campaigns.contains(&welcome.id));
}

#[tokio::test]
async fn should_return_record_not_found_when_changing_unknown_record() {
    let store = InMemoryStore::default();

    let result = change_status_usecase(&store)
        .execute(Uuid::new_v4(), PurchaseStatus::Approved)
        .await;

    assert!(
        matches!(result, Err(BackofficeError::RecordNotFound)),
        "expected RecordNotFound, got: {result:?}"
    );
}

// ── Ledger idempotency ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_treat_repeated_ledger_mutations_as_no_ops() {
    let store = InMemoryStore::default();
    let record_id = pending_record(&store);
    let campaign_id = Uuid::new_v4();

    store.queue(record_id, campaign_id).await.unwrap();
    store.queue(record_id, campaign_id).await.unwrap();
    assert_eq!(store.record(record_id).pending_campaigns.len(), 1);

    store.mark_sent(record_id, campaign_id).await.unwrap();
    store.mark_sent(record_id, campaign_id).await.unwrap();
    let record = store.record(record_id);
    assert_eq!(record.sent_campaigns.len(), 1);
    assert!(record.pending_campaigns.is_empty());
    assert!(store.already_sent(&record, campaign_id));

    // Queueing after delivery does not resurrect the campaign.
    store.queue(record_id, campaign_id).await.unwrap();
    assert!(store.record(record_id).pending_campaigns.is_empty());
}

// ── CreateCampaignUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_queue_new_campaign_on_matching_records() {
    let store = InMemoryStore::default();
    let pending = pending_record(&store);
    let approved = test_record(
        PurchaseStatus::Approved,
        vec![test_participant("Bruno", Some("bruno@example.com"))],
    );
    let approved_id = approved.id;
    store.records.lock().unwrap().push(approved);

    let uc = CreateCampaignUseCase {
        campaigns: store.clone(),
        records: store.clone(),
        ledger: store.clone(),
    };
    let campaign = uc
        .execute(CreateCampaignInput {
            subject: "Payment pending".to_owned(),
            title: "Finish your purchase".to_owned(),
            body: "<p>Your payment is still pending.</p>".to_owned(),
            status_filter: PurchaseStatus::Pending,
            include_credentials: false,
            scheduled: true,
        })
        .await
        .unwrap();

    assert_eq!(store.campaign(campaign.id).subject, "Payment pending");
    assert!(store.record(pending).pending_campaigns.contains(&campaign.id));
    assert!(store.record(approved_id).pending_campaigns.is_empty());
}

// ── CreateRecordUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_record_queued_for_matching_campaigns() {
    let store = InMemoryStore::default();
    let welcome = test_campaign(PurchaseStatus::Approved, true);
    let reminder = test_campaign(PurchaseStatus::Pending, false);
    store.add_campaign(welcome.clone());
    store.add_campaign(reminder.clone());

    let uc = CreateRecordUseCase {
        records: store.clone(),
        ledger: store.clone(),
        campaigns: store.clone(),
    };
    let record = uc
        .execute(CreateRecordInput {
            transaction_id: "tx-42".to_owned(),
            status: PurchaseStatus::Approved,
            payment_method: PaymentMethod::CreditCard { installments: 2 },
            participants: vec![
                NewParticipant {
                    name: "Ana".to_owned(),
                    email: Some("ana@example.com".to_owned()),
                    document: Some("123".to_owned()),
                },
                NewParticipant {
                    name: "Bruno".to_owned(),
                    email: None,
                    document: None,
                },
            ],
            metadata: serde_json::json!({ "source": "box-office" }),
        })
        .await
        .unwrap();

    assert_eq!(record.participants.len(), 2);
    assert_ne!(record.participants[0].id, record.participants[1].id);
    assert!(record.pending_campaigns.contains(&welcome.id));
    assert!(!record.pending_campaigns.contains(&reminder.id));

    let stored = GetRecordUseCase {
        records: store.clone(),
    }
    .execute(record.id)
    .await
    .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn should_return_record_not_found_for_unknown_id() {
    let result = GetRecordUseCase {
        records: InMemoryStore::default(),
    }
    .execute(Uuid::new_v4())
    .await;

    assert!(
        matches!(result, Err(BackofficeError::RecordNotFound)),
        "expected RecordNotFound, got: {result:?}"
    );
}
