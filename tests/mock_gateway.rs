use payments_engine::gateways::mock::MockGateway;
use payments_engine::gateways::{ChargeOutcome, PaymentGateway};
use uuid::Uuid;

#[tokio::test]
async fn repeated_charges_replay_the_settled_outcome() {
    let gw = MockGateway::new("ALWAYS_SUCCESS");
    let id = Uuid::new_v4();

    let first = gw.charge(id, 1_000, "EUR").await.unwrap();
    let second = gw.charge(id, 1_000, "EUR").await.unwrap();

    let (ChargeOutcome::Success { transaction_ref: a }, ChargeOutcome::Success { transaction_ref: b }) =
        (first, second)
    else {
        panic!("expected success outcomes");
    };
    assert_eq!(a, b);
}

#[tokio::test]
async fn lookup_reports_nothing_before_a_settled_charge() {
    let gw = MockGateway::new("ALWAYS_SUCCESS");
    let id = Uuid::new_v4();

    assert!(gw.lookup(id).await.unwrap().is_none());
    gw.charge(id, 1_000, "EUR").await.unwrap();
    assert!(matches!(
        gw.lookup(id).await.unwrap(),
        Some(ChargeOutcome::Success { .. })
    ));
}

#[tokio::test]
async fn retryable_failures_do_not_settle() {
    let gw = MockGateway::new("ALWAYS_RETRYABLE");
    let id = Uuid::new_v4();

    for _ in 0..3 {
        let outcome = gw.charge(id, 1_000, "EUR").await.unwrap();
        assert!(matches!(outcome, ChargeOutcome::RetryableFailure { .. }));
    }
    assert!(gw.lookup(id).await.unwrap().is_none());
}

#[tokio::test]
async fn flaky_behavior_settles_after_transient_failures() {
    let gw = MockGateway::new("FLAKY_THEN_SUCCESS");
    let id = Uuid::new_v4();

    assert!(matches!(
        gw.charge(id, 1_000, "EUR").await.unwrap(),
        ChargeOutcome::RetryableFailure { .. }
    ));
    assert!(matches!(
        gw.charge(id, 1_000, "EUR").await.unwrap(),
        ChargeOutcome::RetryableFailure { .. }
    ));
    assert!(matches!(
        gw.charge(id, 1_000, "EUR").await.unwrap(),
        ChargeOutcome::Success { .. }
    ));
    // Settled now: further charges replay, they never re-evaluate.
    assert!(matches!(
        gw.charge(id, 1_000, "EUR").await.unwrap(),
        ChargeOutcome::Success { .. }
    ));
}

#[tokio::test]
async fn fatal_outcomes_are_deduplicated_too() {
    let gw = MockGateway::new("ALWAYS_FATAL");
    let id = Uuid::new_v4();

    gw.charge(id, 1_000, "EUR").await.unwrap();
    assert!(matches!(
        gw.lookup(id).await.unwrap(),
        Some(ChargeOutcome::FatalFailure { .. })
    ));
}

#[tokio::test]
async fn distinct_payments_settle_independently() {
    let gw = MockGateway::new("ALWAYS_SUCCESS");
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    gw.charge(a, 1_000, "EUR").await.unwrap();
    assert!(gw.lookup(b).await.unwrap().is_none());
}
