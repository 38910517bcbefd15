use crate::domain::payment::PaymentState;
use crate::domain::state_machine::{validate_transition, IllegalTransition};
use crate::repo::payments_repo::PaymentsRepo;
use anyhow::Result;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum TransitionOutcome {
    /// Exactly one concurrent attempt gets this; carries the committed version.
    Ok(i64),
    /// Another transition already happened; the caller must re-derive intent
    /// from the now-current state, never blindly retry the same target.
    Stale(PaymentState),
    Rejected(IllegalTransition),
}

/// All payment mutation funnels through here; the store's transactional
/// guarantees are the only coordination between workers.
#[derive(Clone)]
pub struct ConcurrencyController {
    pub payments_repo: PaymentsRepo,
}

impl ConcurrencyController {
    /// Optimistic path: one conditional update, version bumped atomically.
    pub async fn transition(
        &self,
        payment_id: Uuid,
        expected: PaymentState,
        target: PaymentState,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        if let Err(illegal) = validate_transition(expected, target) {
            return Ok(TransitionOutcome::Rejected(illegal));
        }

        if let Some(version) = self
            .payments_repo
            .compare_and_set_status(payment_id, expected, target, reason)
            .await?
        {
            return Ok(TransitionOutcome::Ok(version));
        }

        let current = self
            .payments_repo
            .get(payment_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("payment {payment_id} vanished during transition"))?;
        Ok(TransitionOutcome::Stale(current.status))
    }

    /// Pessimistic path: exclusive row lock for the read-decide-write
    /// sequence a single conditional update cannot express. The lock is held
    /// for one logical step only.
    pub async fn transition_locked(
        &self,
        payment_id: Uuid,
        expected: PaymentState,
        target: PaymentState,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        if let Err(illegal) = validate_transition(expected, target) {
            return Ok(TransitionOutcome::Rejected(illegal));
        }

        let mut tx = self.payments_repo.pool.begin().await?;
        let current = PaymentsRepo::lock_row_tx(&mut tx, payment_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("payment {payment_id} vanished during transition"))?;

        if current.status != expected {
            tx.rollback().await?;
            return Ok(TransitionOutcome::Stale(current.status));
        }

        let version = PaymentsRepo::set_status_tx(&mut tx, payment_id, target, reason).await?;
        tx.commit().await?;
        Ok(TransitionOutcome::Ok(version))
    }
}
