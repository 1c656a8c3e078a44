use super::*;
use crate::storage::sqlite::users as user_store;
use crate::test_utils::{insert_user, memory_conn};

#[tokio::test]
async fn test_append_credit_updates_cached_balance() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;

    let outcome = append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();

    assert_eq!(outcome, AppendOutcome { balance: 10, applied: true });
    let user = user_store::find(&mut conn, "E001").await.unwrap().unwrap();
    assert_eq!(user.total_points, 10);
}

#[tokio::test]
async fn test_repeated_reference_is_noop() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;

    append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();
    let second = append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();

    assert!(!second.applied);
    assert_eq!(second.balance, 10);
    assert_eq!(entries(&mut conn, "E001").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_reference_under_another_reason_applies() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;

    append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();
    let outcome = append(&mut conn, "E001", 10, LedgerReason::Evaluation, "BOOTH-01")
        .await
        .unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.balance, 20);
}

#[tokio::test]
async fn test_overdraft_is_rejected_without_writing() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    append(&mut conn, "E001", 30, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();

    let err = append(&mut conn, "E001", -40, LedgerReason::GachaSpend, "1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RewardError::InsufficientBalance {
            required: 40,
            available: 30
        }
    ));
    assert_eq!(balance(&mut conn, "E001").await.unwrap(), 30);
    assert_eq!(entries(&mut conn, "E001").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_debit_to_exactly_zero_is_allowed() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    append(&mut conn, "E001", 40, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();

    let outcome = append(&mut conn, "E001", -40, LedgerReason::GachaSpend, "1")
        .await
        .unwrap();

    assert_eq!(outcome.balance, 0);
}

#[tokio::test]
async fn test_zero_delta_and_empty_reference_are_invalid() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;

    let zero = append(&mut conn, "E001", 0, LedgerReason::Visit, "BOOTH-01").await;
    assert!(matches!(zero, Err(RewardError::Validation(_))));

    let empty = append(&mut conn, "E001", 10, LedgerReason::Visit, "").await;
    assert!(matches!(empty, Err(RewardError::Validation(_))));
}

#[tokio::test]
async fn test_unknown_user_is_rejected() {
    let (_pool, mut conn) = memory_conn().await;

    let err = append(&mut conn, "NOBODY", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap_err();

    assert!(matches!(err, RewardError::UnknownUser(id) if id == "NOBODY"));
}

#[tokio::test]
async fn test_audit_matches_entry_sum() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-01")
        .await
        .unwrap();
    append(&mut conn, "E001", 10, LedgerReason::Visit, "BOOTH-02")
        .await
        .unwrap();
    append(&mut conn, "E001", -10, LedgerReason::BoothEntrySpend, "photo-1")
        .await
        .unwrap();

    let audit = audit(&mut conn, "E001").await.unwrap();

    assert!(audit.is_consistent());
    assert_eq!(audit.ledger_sum, 10);
}

#[tokio::test]
async fn test_entries_are_returned_oldest_first() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    for booth in ["BOOTH-01", "BOOTH-02", "BOOTH-03"] {
        append(&mut conn, "E001", 10, LedgerReason::Visit, booth)
            .await
            .unwrap();
    }

    let refs: Vec<String> = entries(&mut conn, "E001")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.reference_id)
        .collect();

    assert_eq!(refs, ["BOOTH-01", "BOOTH-02", "BOOTH-03"]);
}

#[test]
fn test_reason_round_trips_through_text() {
    for reason in [
        LedgerReason::Visit,
        LedgerReason::Evaluation,
        LedgerReason::Mission,
        LedgerReason::GachaSpend,
        LedgerReason::BoothEntrySpend,
    ] {
        assert_eq!(reason.as_str().parse::<LedgerReason>().unwrap(), reason);
    }
}
