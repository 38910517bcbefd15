use crate::domain::payment::{CreatePaymentRequest, ErrorEnvelope, ErrorPayload, PaymentResponse, PaymentState};
use crate::repo::jobs_repo::JobsRepo;
use crate::repo::payments_repo::PaymentsRepo;
use crate::service::ledger::{AdmitOutcome, IdempotencyLedger};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum AdmissionResult {
    Created(PaymentResponse),
    Replayed(PaymentResponse),
    InFlight,
    KeyReused,
}

#[derive(Clone)]
pub struct AdmissionService {
    pub pool: PgPool,
    pub ledger: IdempotencyLedger,
}

impl AdmissionService {
    /// N concurrent identical submissions produce exactly one payment and
    /// one enqueued processing job; everyone else observes the winner.
    pub async fn submit(
        &self,
        idempotency_key: &str,
        req: &CreatePaymentRequest,
    ) -> Result<AdmissionResult, (axum::http::StatusCode, ErrorEnvelope)> {
        validate_request(req)?;

        let fingerprint = request_fingerprint(req);
        match self
            .ledger
            .admit(idempotency_key, &fingerprint)
            .await
            .map_err(internal)?
        {
            AdmitOutcome::Replay(snapshot) => return Ok(AdmissionResult::Replayed(snapshot)),
            AdmitOutcome::Conflict => return Ok(AdmissionResult::KeyReused),
            AdmitOutcome::InFlight => return Ok(AdmissionResult::InFlight),
            AdmitOutcome::New => {}
        }

        let payment_id = Uuid::new_v4();
        let response = PaymentResponse {
            payment_id,
            status: PaymentState::Pending,
        };

        // One unit: payment row, job enqueue, key resolution commit together.
        let mut tx = self.pool.begin().await.map_err(|e| internal(e.into()))?;
        PaymentsRepo::insert_pending_tx(&mut tx, payment_id, req.amount_minor, &req.currency)
            .await
            .map_err(internal)?;
        JobsRepo::enqueue_tx(&mut tx, payment_id).await.map_err(internal)?;
        IdempotencyLedger::resolve_tx(&mut tx, idempotency_key, payment_id, &response)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(|e| internal(e.into()))?;

        tracing::info!(%payment_id, "payment admitted");
        Ok(AdmissionResult::Created(response))
    }
}

/// Stable across processes and restarts, unlike the default hasher: a replay
/// arriving at a different worker must still match the recorded fingerprint.
pub fn request_fingerprint(req: &CreatePaymentRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.amount_minor.to_le_bytes());
    hasher.update(req.currency.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn validate_request(req: &CreatePaymentRequest) -> Result<(), (axum::http::StatusCode, ErrorEnvelope)> {
    if req.amount_minor <= 0 {
        return Err((
            axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            err("VALIDATION_REJECTED", "amount_minor must be > 0"),
        ));
    }
    if req.currency.len() != 3 || !req.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err((
            axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            err("VALIDATION_REJECTED", "currency must be a 3-letter uppercase code"),
        ));
    }
    Ok(())
}

pub fn err(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    }
}

pub fn internal(e: anyhow::Error) -> (axum::http::StatusCode, ErrorEnvelope) {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        err("INTERNAL_ERROR", &e.to_string()),
    )
}
