use payments_engine::gateways::ChargeOutcome;
use payments_engine::service::processor::{
    directive_for, with_jitter, BackoffPolicy, ChargeDirective, REASON_RETRIES_EXHAUSTED,
};

fn policy() -> BackoffPolicy {
    BackoffPolicy {
        base_delay_ms: 500,
        multiplier: 2.0,
        max_delay_ms: 60_000,
        max_attempts: 5,
    }
}

#[test]
fn backoff_grows_exponentially_from_base() {
    let p = policy();
    assert_eq!(p.delay_ms(0), 500);
    assert_eq!(p.delay_ms(1), 1_000);
    assert_eq!(p.delay_ms(2), 2_000);
    assert_eq!(p.delay_ms(3), 4_000);
}

#[test]
fn backoff_is_capped() {
    let p = policy();
    assert_eq!(p.delay_ms(30), 60_000);
}

#[test]
fn negative_attempt_clamps_to_base() {
    let p = policy();
    assert_eq!(p.delay_ms(-3), 500);
}

#[test]
fn jitter_stays_within_a_quarter_of_the_delay() {
    for _ in 0..100 {
        let d = with_jitter(4_000);
        assert!((4_000..=5_000).contains(&d));
    }
}

#[test]
fn success_settles_the_payment() {
    let outcome = ChargeOutcome::Success {
        transaction_ref: "txn_1".to_string(),
    };
    let directive = directive_for(&outcome, 1, &policy());
    assert!(matches!(directive, ChargeDirective::MarkSucceeded { transaction_ref } if transaction_ref == "txn_1"));
}

#[test]
fn fatal_failure_fails_immediately_regardless_of_budget() {
    let outcome = ChargeOutcome::FatalFailure {
        code: "CARD_DECLINED".to_string(),
        message: "declined".to_string(),
    };
    let directive = directive_for(&outcome, 1, &policy());
    assert!(matches!(directive, ChargeDirective::MarkFailed { reason } if reason.contains("CARD_DECLINED")));
}

#[test]
fn retryable_failure_retries_while_budget_remains() {
    let outcome = ChargeOutcome::RetryableFailure {
        code: "TIMEOUT".to_string(),
        message: "gateway timeout".to_string(),
    };
    let directive = directive_for(&outcome, 4, &policy());
    assert!(matches!(directive, ChargeDirective::Retry));
}

#[test]
fn retryable_failure_fails_once_attempts_exhausted() {
    let outcome = ChargeOutcome::RetryableFailure {
        code: "TIMEOUT".to_string(),
        message: "gateway timeout".to_string(),
    };
    let directive = directive_for(&outcome, 5, &policy());
    assert!(matches!(directive, ChargeDirective::MarkFailed { reason } if reason == REASON_RETRIES_EXHAUSTED));
}
