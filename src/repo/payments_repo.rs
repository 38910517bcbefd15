use crate::domain::payment::PaymentState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct StoredPayment {
    pub payment_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentState,
    pub version: i64,
    pub last_transition_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PAYMENT_COLUMNS: &str =
    "payment_id, amount_minor, currency, status, version, last_transition_reason, created_at, updated_at";

fn row_to_payment(row: sqlx::postgres::PgRow) -> Result<StoredPayment> {
    let status: String = row.get("status");
    let status = PaymentState::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown payment status in store: {status}"))?;
    Ok(StoredPayment {
        payment_id: row.get("payment_id"),
        amount_minor: row.get("amount_minor"),
        currency: row.get("currency"),
        status,
        version: row.get("version"),
        last_transition_reason: row.get("last_transition_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl PaymentsRepo {
    pub async fn insert_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
        amount_minor: i64,
        currency: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, amount_minor, currency, status, version)
            VALUES ($1, $2, $3, 'PENDING', 1)
            "#,
        )
        .bind(payment_id)
        .bind(amount_minor)
        .bind(currency)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn get(&self, payment_id: Uuid) -> Result<Option<StoredPayment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_payment).transpose()
    }

    /// Conditional update: commits only if the row still holds the expected
    /// status. Returns the new version, or None when zero rows matched.
    pub async fn compare_and_set_status(
        &self,
        payment_id: Uuid,
        expected: PaymentState,
        target: PaymentState,
        reason: &str,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, version = version + 1, last_transition_reason = $4, updated_at = now()
            WHERE payment_id = $1 AND status = $2
            RETURNING version
            "#,
        )
        .bind(payment_id)
        .bind(expected.as_str())
        .bind(target.as_str())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("version")))
    }

    /// Exclusive row lock for read-decide-write sequences; held until the
    /// surrounding transaction commits or rolls back.
    pub async fn lock_row_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
    ) -> Result<Option<StoredPayment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_optional(tx.as_mut())
        .await?;

        row.map(row_to_payment).transpose()
    }

    pub async fn set_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
        target: PaymentState,
        reason: &str,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, version = version + 1, last_transition_reason = $3, updated_at = now()
            WHERE payment_id = $1
            RETURNING version
            "#,
        )
        .bind(payment_id)
        .bind(target.as_str())
        .bind(reason)
        .fetch_one(tx.as_mut())
        .await?;

        Ok(row.get("version"))
    }

    pub async fn find_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<StoredPayment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE status = 'PROCESSING' AND updated_at < $1
            ORDER BY updated_at ASC
            LIMIT $2
            "#
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_payment).collect()
    }
}
