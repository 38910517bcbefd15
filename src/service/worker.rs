use crate::repo::jobs_repo::JobsRepo;
use crate::service::processor::{with_jitter, PaymentProcessor, ProcessOutcome};
use anyhow::Result;
use chrono::Utc;

/// Polls the job table and runs processing units. Any number of workers may
/// run concurrently; `FOR UPDATE SKIP LOCKED` claiming keeps them off each
/// other's jobs.
#[derive(Clone)]
pub struct JobWorker {
    pub jobs_repo: JobsRepo,
    pub processor: PaymentProcessor,
    pub poll_interval_ms: u64,
    pub batch_size: i64,
    pub reclaim_after_secs: i64,
}

impl JobWorker {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("job worker tick failed: {err:#}");
            }
            tokio::time::sleep(std::time::Duration::from_millis(self.poll_interval_ms)).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        let reclaim_cutoff = Utc::now() - chrono::Duration::seconds(self.reclaim_after_secs);
        let batch = self.jobs_repo.claim_due(self.batch_size, reclaim_cutoff).await?;

        for job in batch {
            match self.processor.run_once(job.payment_id, job.attempts).await {
                Ok(ProcessOutcome::Completed) | Ok(ProcessOutcome::AlreadyTerminal) => {
                    self.jobs_repo.mark_done(job.id).await?;
                }
                Ok(ProcessOutcome::Retry { next_attempt }) => {
                    let delay_ms = with_jitter(self.processor.backoff.delay_ms(next_attempt));
                    let next_at = Utc::now() + chrono::Duration::milliseconds(delay_ms as i64);
                    self.jobs_repo.mark_retry(job.id, next_attempt, next_at).await?;
                    tracing::info!(payment_id = %job.payment_id, next_attempt, delay_ms, "retry scheduled");
                }
                Ok(ProcessOutcome::Exhausted) => {
                    self.jobs_repo.mark_dead(job.id).await?;
                    tracing::warn!(payment_id = %job.payment_id, "retries exhausted, payment failed");
                }
                // Infrastructure failure: requeue without touching the attempt
                // count, delivery stays at-least-once.
                Err(err) => {
                    let next_at = Utc::now() + chrono::Duration::milliseconds(self.poll_interval_ms as i64 * 4);
                    self.jobs_repo.mark_retry(job.id, job.attempts, next_at).await?;
                    tracing::warn!(payment_id = %job.payment_id, "processing unit failed, requeued: {err:#}");
                }
            }
        }

        Ok(())
    }
}
