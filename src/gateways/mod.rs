use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod mock;

/// Settled outcomes carry financial effect; a retryable failure means the
/// charge did not take effect and may be attempted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeOutcome {
    Success { transaction_ref: String },
    RetryableFailure { code: String, message: String },
    FatalFailure { code: String, message: String },
}

impl ChargeOutcome {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ChargeOutcome::RetryableFailure { .. })
    }
}

/// External processor contract: `charge` deduplicates on the payment id, so
/// repeated calls from retries or reconciliation never double-charge.
/// `lookup` reports the settled outcome the processor holds, if any.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn charge(&self, payment_id: Uuid, amount_minor: i64, currency: &str) -> Result<ChargeOutcome>;

    async fn lookup(&self, payment_id: Uuid) -> Result<Option<ChargeOutcome>>;
}
