use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct IdempotencyRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct IdempotencyRow {
    pub idempotency_key: String,
    pub request_hash: String,
    pub payment_id: Option<Uuid>,
    pub response_json: Option<serde_json::Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRepo {
    /// Race-free creation: the uniqueness constraint on the key decides the
    /// winner. Returns true when this call inserted the row.
    pub async fn try_insert(&self, key: &str, request_hash: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (idempotency_key, request_hash, status)
            VALUES ($1, $2, 'IN_FLIGHT')
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(request_hash)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    pub async fn get(&self, key: &str) -> Result<Option<IdempotencyRow>> {
        let row = sqlx::query(
            r#"
            SELECT idempotency_key, request_hash, payment_id, response_json, status, created_at
            FROM idempotency_keys
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| IdempotencyRow {
            idempotency_key: r.get("idempotency_key"),
            request_hash: r.get("request_hash"),
            payment_id: r.get("payment_id"),
            response_json: r.get("response_json"),
            status: r.get("status"),
            created_at: r.get("created_at"),
        }))
    }

    /// Idempotent: the IN_FLIGHT guard makes resolving an already-resolved
    /// key a no-op.
    pub async fn resolve_tx(
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
        status: &str,
        payment_id: Uuid,
        response_json: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET status = $2, payment_id = $3, response_json = $4, updated_at = now()
            WHERE idempotency_key = $1 AND status = 'IN_FLIGHT'
            "#,
        )
        .bind(key)
        .bind(status)
        .bind(payment_id)
        .bind(response_json)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }
}
