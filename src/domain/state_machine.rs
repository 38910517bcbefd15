use crate::domain::payment::PaymentState;

/// A transition the state machine refused, with both ends kept for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PaymentState,
    pub to: PaymentState,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from.as_str(), self.to.as_str())
    }
}

/// Legal transitions. PENDING -> FAILED exists only for pre-processing
/// validation rejection; same-state writes and anything out of a terminal
/// state are refused.
pub fn transition_allowed(from: PaymentState, to: PaymentState) -> bool {
    matches!(
        (from, to),
        (PaymentState::Pending, PaymentState::Processing)
            | (PaymentState::Processing, PaymentState::Succeeded)
            | (PaymentState::Processing, PaymentState::Failed)
            | (PaymentState::Pending, PaymentState::Failed)
    )
}

pub fn validate_transition(from: PaymentState, to: PaymentState) -> Result<(), IllegalTransition> {
    if transition_allowed(from, to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
