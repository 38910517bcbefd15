use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PaymentJob {
    pub id: i64,
    pub payment_id: Uuid,
    pub attempts: i32,
}

#[derive(Clone)]
pub struct JobsRepo {
    pub pool: PgPool,
}

impl JobsRepo {
    pub async fn enqueue_tx(tx: &mut Transaction<'_, Postgres>, payment_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_jobs (payment_id, status, attempts, next_attempt_at)
            VALUES ($1, 'PENDING', 0, now())
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(payment_id)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// Claims a batch of due jobs. RUNNING rows whose worker went silent past
    /// the reclaim cutoff are picked up again, so a submitted job survives a
    /// worker crash; delivery is at-least-once.
    pub async fn claim_due(&self, batch_size: i64, reclaim_cutoff: DateTime<Utc>) -> Result<Vec<PaymentJob>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, payment_id, attempts
            FROM payment_jobs
            WHERE (status = 'PENDING' AND next_attempt_at <= now())
               OR (status = 'RUNNING' AND updated_at < $2)
            ORDER BY next_attempt_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(batch_size)
        .bind(reclaim_cutoff)
        .fetch_all(tx.as_mut())
        .await?;

        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        sqlx::query("UPDATE payment_jobs SET status = 'RUNNING', updated_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|r| PaymentJob {
                id: r.get("id"),
                payment_id: r.get("payment_id"),
                attempts: r.get("attempts"),
            })
            .collect())
    }

    pub async fn mark_done(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE payment_jobs SET status = 'DONE', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_retry(&self, id: i64, attempts: i32, next_attempt_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE payment_jobs SET status = 'PENDING', attempts = $2, next_attempt_at = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_dead(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE payment_jobs SET status = 'DEAD', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
