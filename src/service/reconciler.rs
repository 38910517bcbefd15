use crate::domain::payment::PaymentState;
use crate::gateways::{ChargeOutcome, PaymentGateway};
use crate::repo::payments_repo::PaymentsRepo;
use crate::service::concurrency::{ConcurrencyController, TransitionOutcome};
use crate::service::processor::REASON_GATEWAY_SUCCESS;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

/// Out-of-band audit for workers that claimed PROCESSING and never finished.
/// Settles stuck payments from the gateway's authoritative record through the
/// same transition path normal processing uses.
#[derive(Clone)]
pub struct ReconciliationSweeper {
    pub payments_repo: PaymentsRepo,
    pub concurrency: ConcurrencyController,
    pub gateway: Arc<dyn PaymentGateway>,
    pub staleness_secs: i64,
    pub sweep_interval_secs: u64,
    pub batch_size: i64,
}

impl ReconciliationSweeper {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("reconciliation sweep failed: {err:#}");
            }
            tokio::time::sleep(std::time::Duration::from_secs(self.sweep_interval_secs)).await;
        }
    }

    pub async fn tick(&self) -> Result<()> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.staleness_secs);
        let stuck = self.payments_repo.find_stale_processing(cutoff, self.batch_size).await?;

        for payment in stuck {
            let payment_id = payment.payment_id;
            let settled = match self.gateway.lookup(payment_id).await {
                Ok(settled) => settled,
                Err(err) => {
                    tracing::warn!(%payment_id, "gateway unreachable, leaving for next sweep: {err:#}");
                    continue;
                }
            };

            let (target, reason) = match settled {
                Some(ChargeOutcome::Success { transaction_ref }) => (
                    PaymentState::Succeeded,
                    format!("{REASON_GATEWAY_SUCCESS}:{transaction_ref}"),
                ),
                Some(ChargeOutcome::FatalFailure { code, .. }) => {
                    (PaymentState::Failed, format!("FATAL_FAILURE:{code}"))
                }
                // No settled charge on record: the job substrate still owns
                // this payment and will redeliver; inventing a terminal
                // outcome here could contradict a charge that lands later.
                Some(ChargeOutcome::RetryableFailure { .. }) | None => {
                    tracing::info!(%payment_id, "stuck payment has no settled gateway record, skipping");
                    continue;
                }
            };

            match self
                .concurrency
                .transition(payment_id, PaymentState::Processing, target, &reason)
                .await?
            {
                TransitionOutcome::Ok(version) => {
                    tracing::info!(%payment_id, status = target.as_str(), version, "stuck payment reconciled");
                }
                TransitionOutcome::Stale(current) => {
                    tracing::debug!(%payment_id, current = current.as_str(), "payment moved on its own, skipping");
                }
                TransitionOutcome::Rejected(illegal) => {
                    tracing::error!(%payment_id, "reconcile transition rejected: {illegal}");
                }
            }
        }

        Ok(())
    }
}
