use crate::domain::payment::PaymentResponse;
use crate::repo::idempotency_repo::IdempotencyRepo;
use anyhow::Result;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum AdmitOutcome {
    /// This caller won the creation race; the IN_FLIGHT record is durable
    /// before any side-effecting work starts.
    New,
    /// Same key, same fingerprint, resolved: the cached snapshot verbatim.
    Replay(PaymentResponse),
    /// Same key, different fingerprint: reject, never execute.
    Conflict,
    /// Same key, same fingerprint, original caller not finished yet.
    InFlight,
}

#[derive(Clone)]
pub struct IdempotencyLedger {
    pub repo: IdempotencyRepo,
}

impl IdempotencyLedger {
    pub async fn admit(&self, key: &str, fingerprint: &str) -> Result<AdmitOutcome> {
        if self.repo.try_insert(key, fingerprint).await? {
            return Ok(AdmitOutcome::New);
        }

        let row = self
            .repo
            .get(key)
            .await?
            .ok_or_else(|| anyhow::anyhow!("idempotency key {key} lost after conflict"))?;

        if row.request_hash != fingerprint {
            return Ok(AdmitOutcome::Conflict);
        }

        if row.status == "IN_FLIGHT" {
            return Ok(AdmitOutcome::InFlight);
        }

        let snapshot = row
            .response_json
            .ok_or_else(|| anyhow::anyhow!("resolved idempotency key {key} has no snapshot"))?;
        Ok(AdmitOutcome::Replay(serde_json::from_value(snapshot)?))
    }

    /// Part of the admission transaction, so key resolution commits
    /// atomically with the payment it points at.
    pub async fn resolve_tx(
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
        payment_id: Uuid,
        response: &PaymentResponse,
    ) -> Result<()> {
        IdempotencyRepo::resolve_tx(tx, key, "COMPLETED", payment_id, serde_json::to_value(response)?).await
    }
}
