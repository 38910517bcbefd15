use crate::domain::payment::PaymentState;
use crate::gateways::{ChargeOutcome, PaymentGateway};
use crate::repo::payments_repo::{PaymentsRepo, StoredPayment};
use crate::service::concurrency::{ConcurrencyController, TransitionOutcome};
use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

pub const REASON_CLAIMED: &str = "CLAIMED_FOR_PROCESSING";
pub const REASON_GATEWAY_SUCCESS: &str = "GATEWAY_SUCCESS";
pub const REASON_VALIDATION_REJECTED: &str = "VALIDATION_REJECTED";
pub const REASON_RETRIES_EXHAUSTED: &str = "RETRIES_EXHAUSTED";

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: i32,
}

impl BackoffPolicy {
    /// Exponential growth from the base, capped. Attempt 0 gets the base.
    pub fn delay_ms(&self, attempt: i32) -> u64 {
        let factor = self.multiplier.powi(attempt.max(0));
        let raw = (self.base_delay_ms as f64 * factor) as u64;
        raw.min(self.max_delay_ms)
    }

    pub fn attempts_exhausted(&self, next_attempt: i32) -> bool {
        next_attempt >= self.max_attempts
    }
}

/// Up to 25% added on top, so synchronized retries fan out.
pub fn with_jitter(delay_ms: u64) -> u64 {
    let spread = delay_ms / 4;
    if spread == 0 {
        return delay_ms;
    }
    delay_ms + rand::thread_rng().gen_range(0..=spread)
}

#[derive(Debug, Clone)]
pub enum ChargeDirective {
    MarkSucceeded { transaction_ref: String },
    MarkFailed { reason: String },
    Retry,
}

pub fn directive_for(outcome: &ChargeOutcome, next_attempt: i32, policy: &BackoffPolicy) -> ChargeDirective {
    match outcome {
        ChargeOutcome::Success { transaction_ref } => ChargeDirective::MarkSucceeded {
            transaction_ref: transaction_ref.clone(),
        },
        ChargeOutcome::FatalFailure { code, .. } => ChargeDirective::MarkFailed {
            reason: format!("FATAL_FAILURE:{code}"),
        },
        ChargeOutcome::RetryableFailure { .. } => {
            if policy.attempts_exhausted(next_attempt) {
                ChargeDirective::MarkFailed {
                    reason: REASON_RETRIES_EXHAUSTED.to_string(),
                }
            } else {
                ChargeDirective::Retry
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ProcessOutcome {
    /// Payment reached a terminal state during this invocation.
    Completed,
    /// Already terminal on entry; re-delivery under at-least-once is a no-op.
    AlreadyTerminal,
    /// Gateway failure was transient; run again after backoff.
    Retry { next_attempt: i32 },
    /// Retry budget spent; payment force-failed.
    Exhausted,
}

/// One processing unit, keyed by payment id, safe to invoke any number of
/// times. The gateway is called at most once per claim of PROCESSING and
/// deduplicates on payment id itself.
#[derive(Clone)]
pub struct PaymentProcessor {
    pub payments_repo: PaymentsRepo,
    pub concurrency: ConcurrencyController,
    pub gateway: Arc<dyn PaymentGateway>,
    pub backoff: BackoffPolicy,
}

impl PaymentProcessor {
    pub async fn run_once(&self, payment_id: Uuid, attempt: i32) -> Result<ProcessOutcome> {
        let payment = self
            .payments_repo
            .get(payment_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("job references unknown payment {payment_id}"))?;

        if payment.status.is_terminal() {
            return Ok(ProcessOutcome::AlreadyTerminal);
        }

        if payment.status == PaymentState::Pending {
            if let Some(reason) = pre_processing_rejection(&payment) {
                match self
                    .concurrency
                    .transition(payment_id, PaymentState::Pending, PaymentState::Failed, &reason)
                    .await?
                {
                    TransitionOutcome::Ok(_) => {
                        tracing::warn!(%payment_id, %reason, "payment rejected before processing");
                        return Ok(ProcessOutcome::Completed);
                    }
                    // Lost the race; whoever won drives it from here.
                    TransitionOutcome::Stale(_) | TransitionOutcome::Rejected(_) => {
                        return Ok(ProcessOutcome::AlreadyTerminal)
                    }
                }
            }

            match self
                .concurrency
                .transition(payment_id, PaymentState::Pending, PaymentState::Processing, REASON_CLAIMED)
                .await?
            {
                TransitionOutcome::Ok(_) => {}
                TransitionOutcome::Stale(current) if current.is_terminal() => {
                    return Ok(ProcessOutcome::AlreadyTerminal)
                }
                // A prior invocation claimed PROCESSING and crashed before the
                // terminal write; re-claiming is expected, the charge below is
                // deduplicated by the gateway.
                TransitionOutcome::Stale(PaymentState::Processing) => {}
                TransitionOutcome::Stale(current) => {
                    anyhow::bail!("payment {payment_id} in unexpected state {} after claim race", current.as_str())
                }
                TransitionOutcome::Rejected(illegal) => anyhow::bail!("claim rejected: {illegal}"),
            }
        }

        let outcome = self
            .gateway
            .charge(payment_id, payment.amount_minor, &payment.currency)
            .await?;

        let next_attempt = attempt + 1;
        match directive_for(&outcome, next_attempt, &self.backoff) {
            ChargeDirective::MarkSucceeded { transaction_ref } => {
                let reason = format!("{REASON_GATEWAY_SUCCESS}:{transaction_ref}");
                self.finish(payment_id, PaymentState::Succeeded, &reason).await?;
                Ok(ProcessOutcome::Completed)
            }
            ChargeDirective::MarkFailed { reason } if reason == REASON_RETRIES_EXHAUSTED => {
                // Read-then-decide under the row lock: the payment must still
                // be PROCESSING when the forced failure lands.
                match self
                    .concurrency
                    .transition_locked(payment_id, PaymentState::Processing, PaymentState::Failed, &reason)
                    .await?
                {
                    TransitionOutcome::Ok(_) => Ok(ProcessOutcome::Exhausted),
                    TransitionOutcome::Stale(_) | TransitionOutcome::Rejected(_) => {
                        Ok(ProcessOutcome::AlreadyTerminal)
                    }
                }
            }
            ChargeDirective::MarkFailed { reason } => {
                self.finish(payment_id, PaymentState::Failed, &reason).await?;
                Ok(ProcessOutcome::Completed)
            }
            ChargeDirective::Retry => Ok(ProcessOutcome::Retry { next_attempt }),
        }
    }

    async fn finish(&self, payment_id: Uuid, target: PaymentState, reason: &str) -> Result<()> {
        match self
            .concurrency
            .transition(payment_id, PaymentState::Processing, target, reason)
            .await?
        {
            TransitionOutcome::Ok(version) => {
                tracing::info!(%payment_id, status = target.as_str(), version, "payment settled");
                Ok(())
            }
            // The sweeper or a redelivered unit got there first with the same
            // gateway-reported outcome.
            TransitionOutcome::Stale(current) => {
                tracing::debug!(%payment_id, current = current.as_str(), "terminal write superseded");
                Ok(())
            }
            TransitionOutcome::Rejected(illegal) => anyhow::bail!("terminal write rejected: {illegal}"),
        }
    }
}

fn pre_processing_rejection(payment: &StoredPayment) -> Option<String> {
    if payment.amount_minor <= 0 {
        return Some(format!("{REASON_VALIDATION_REJECTED}:NON_POSITIVE_AMOUNT"));
    }
    None
}
