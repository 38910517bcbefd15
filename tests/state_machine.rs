use payments_engine::domain::payment::PaymentState;
use payments_engine::domain::state_machine::{transition_allowed, validate_transition};

#[test]
fn legal_transitions_are_allowed() {
    assert!(transition_allowed(PaymentState::Pending, PaymentState::Processing));
    assert!(transition_allowed(PaymentState::Processing, PaymentState::Succeeded));
    assert!(transition_allowed(PaymentState::Processing, PaymentState::Failed));
    assert!(transition_allowed(PaymentState::Pending, PaymentState::Failed));
}

#[test]
fn terminal_states_admit_nothing() {
    for from in [PaymentState::Succeeded, PaymentState::Failed] {
        for to in [
            PaymentState::Pending,
            PaymentState::Processing,
            PaymentState::Succeeded,
            PaymentState::Failed,
        ] {
            assert!(!transition_allowed(from, to), "{} -> {}", from.as_str(), to.as_str());
        }
    }
}

#[test]
fn same_state_writes_are_rejected() {
    for state in [PaymentState::Pending, PaymentState::Processing] {
        assert!(!transition_allowed(state, state));
    }
}

#[test]
fn backwards_transition_is_rejected_with_diagnostics() {
    let err = validate_transition(PaymentState::Processing, PaymentState::Pending).unwrap_err();
    assert_eq!(err.from, PaymentState::Processing);
    assert_eq!(err.to, PaymentState::Pending);
    assert!(err.to_string().contains("PROCESSING"));
    assert!(err.to_string().contains("PENDING"));
}

#[test]
fn pending_cannot_jump_straight_to_succeeded() {
    assert!(validate_transition(PaymentState::Pending, PaymentState::Succeeded).is_err());
}
