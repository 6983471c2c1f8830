use uuid::Uuid;

use catraca_backoffice::domain::repository::PurchaseRecordRepository;
use catraca_backoffice::domain::types::Credential;
use catraca_backoffice::error::BackofficeError;
use catraca_backoffice::usecase::credential::{IssueCredentialsInput, issue_credentials};
use catraca_backoffice::usecase::redeem::RedeemCredentialUseCase;
use catraca_domain::status::PurchaseStatus;

use crate::helpers::{
    InMemoryStore, ReadThenWriteStore, test_calendar, test_participant, test_record, test_signer,
};

fn usecase<R: PurchaseRecordRepository>(records: R) -> RedeemCredentialUseCase<R> {
    RedeemCredentialUseCase {
        records,
        signer: test_signer(),
        calendar: test_calendar(),
    }
}

/// Seed one approved record with participants Ana and Bruno, and issue Ana's credentials.
/// Returns the record id and Ana's payloads in day order.
async fn seeded(store: &InMemoryStore) -> (Uuid, Vec<String>) {
    let record = test_record(
        PurchaseStatus::Approved,
        vec![
            test_participant("Ana", Some("ana@example.com")),
            test_participant("Bruno", None),
        ],
    );
    let record_id = record.id;
    store.insert(&record).await.unwrap();
    let issued = issue_credentials(
        store,
        &test_signer(),
        &test_calendar(),
        IssueCredentialsInput {
            record_id,
            participant_index: 0,
            force: false,
        },
    )
    .await
    .unwrap();
    (
        record_id,
        issued.credentials.into_iter().map(|c| c.payload).collect(),
    )
}

fn tamper(payload: &str, edit: impl FnOnce(&mut Credential)) -> String {
    let mut credential = Credential::parse(payload).unwrap();
    edit(&mut credential);
    credential.to_payload().unwrap()
}

#[tokio::test]
async fn should_redeem_once_per_day_then_refuse_replay() {
    let store = InMemoryStore::default();
    let (record_id, payloads) = seeded(&store).await;
    let uc = usecase(store.clone());

    let first = uc.execute(&payloads[0]).await.unwrap();
    assert!(first.valid);
    assert_eq!(first.record_id, record_id);
    assert_eq!(first.participant_index, 0);
    assert_eq!(first.participant_name, "Ana");
    assert_eq!(first.day.to_string(), "2025-03-14");

    let replay = uc.execute(&payloads[0]).await;
    assert!(
        matches!(replay, Err(BackofficeError::AlreadyRedeemed)),
        "expected AlreadyRedeemed, got: {replay:?}"
    );

    // The other day is independent.
    let second_day = uc.execute(&payloads[1]).await.unwrap();
    assert_eq!(second_day.day.to_string(), "2025-03-15");

    let record = store.record(record_id);
    let stored = &record.participants[0];
    assert!(stored.redemption_state.values().all(|r| *r));

    let logs = store.redemptions.lock().unwrap();
    assert_eq!(logs.len(), 2, "one audit entry per successful redemption");
    assert_eq!(logs[0].participant_id, stored.id);
}

#[tokio::test]
async fn should_admit_exactly_one_of_two_concurrent_scans() {
    let store = InMemoryStore::default();
    let (_, payloads) = seeded(&store).await;
    let uc = usecase(store.clone());

    let (a, b) = tokio::join!(uc.execute(&payloads[0]), uc.execute(&payloads[0]));

    let admitted = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1, "got: {a:?} / {b:?}");
    assert!(
        [a, b]
            .into_iter()
            .any(|r| matches!(r, Err(BackofficeError::AlreadyRedeemed)))
    );
    assert_eq!(store.redemptions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_double_admit_with_a_read_then_write_store() {
    // Read then write in two steps lets both scans through.
    let racy = ReadThenWriteStore::default();
    let (_, payloads) = seeded(&racy.inner).await;
    let uc = usecase(racy.clone());

    let (a, b) = tokio::join!(uc.execute(&payloads[0]), uc.execute(&payloads[0]));

    assert!(a.is_ok() && b.is_ok(), "both scans slipped through: {a:?} / {b:?}");
}

#[tokio::test]
async fn should_reject_superseded_payload_after_forced_reissue() {
    let store = InMemoryStore::default();
    let (record_id, old_payloads) = seeded(&store).await;

    let reissued = issue_credentials(
        &store,
        &test_signer(),
        &test_calendar(),
        IssueCredentialsInput {
            record_id,
            participant_index: 0,
            force: true,
        },
    )
    .await
    .unwrap();
    let uc = usecase(store.clone());

    let stale = uc.execute(&old_payloads[0]).await;
    assert!(
        matches!(stale, Err(BackofficeError::StaleOrUnknownCredential)),
        "expected StaleOrUnknownCredential, got: {stale:?}"
    );

    let current = uc.execute(&reissued.credentials[0].payload).await.unwrap();
    assert!(current.valid);
}

#[tokio::test]
async fn should_reject_malformed_payload() {
    let uc = usecase(InMemoryStore::default());

    for scanned in ["", "not json", r#"{"record_id":"x"}"#] {
        let result = uc.execute(scanned).await;
        assert!(
            matches!(result, Err(BackofficeError::MalformedCredential)),
            "expected MalformedCredential for {scanned:?}, got: {result:?}"
        );
    }
}

#[tokio::test]
async fn should_reject_payload_with_tampered_fields() {
    let store = InMemoryStore::default();
    let (_, payloads) = seeded(&store).await;
    let uc = usecase(store.clone());

    // Point Ana's credential at Bruno.
    let other_participant = tamper(&payloads[0], |c| c.participant_index = 1);
    // Move day one's credential onto day two.
    let other_day = tamper(&payloads[0], |c| c.day = test_calendar().days()[1]);

    for scanned in [other_participant, other_day] {
        let result = uc.execute(&scanned).await;
        assert!(
            matches!(result, Err(BackofficeError::InvalidSignature)),
            "expected InvalidSignature, got: {result:?}"
        );
    }
    assert!(store.redemptions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_signed_credential_for_day_outside_calendar() {
    let store = InMemoryStore::default();
    let (record_id, payloads) = seeded(&store).await;
    let day = "2025-03-16".parse().unwrap();
    let signature = test_signer().sign(record_id, 0, &day);
    let forged = tamper(&payloads[0], |c| {
        c.day = day;
        c.signature = signature;
    });

    let result = usecase(store).execute(&forged).await;

    assert!(
        matches!(result, Err(BackofficeError::StaleOrUnknownCredential)),
        "expected StaleOrUnknownCredential, got: {result:?}"
    );
}

#[tokio::test]
async fn should_reject_signed_payload_never_issued() {
    let store = InMemoryStore::default();
    let (_, payloads) = seeded(&store).await;
    // Validly signed for Ana but with a serial the store never handed out.
    let unissued = tamper(&payloads[0], |c| c.serial = Uuid::new_v4());

    let result = usecase(store).execute(&unissued).await;

    assert!(
        matches!(result, Err(BackofficeError::StaleOrUnknownCredential)),
        "expected StaleOrUnknownCredential, got: {result:?}"
    );
}
