use crate::domain::payment::{CreatePaymentRequest, PaymentView};
use crate::service::admission::{err, internal, AdmissionResult};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    let Some(idempotency_key) = headers
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(err("MISSING_IDEMPOTENCY_KEY", "Idempotency-Key header is required")),
        )
            .into_response();
    };

    match state.admission.submit(&idempotency_key, &req).await {
        Ok(AdmissionResult::Created(resp)) => (StatusCode::CREATED, Json(resp)).into_response(),
        Ok(AdmissionResult::Replayed(resp)) => (StatusCode::OK, Json(resp)).into_response(),
        Ok(AdmissionResult::InFlight) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "PROCESSING" })),
        )
            .into_response(),
        Ok(AdmissionResult::KeyReused) => (
            StatusCode::CONFLICT,
            Json(err(
                "IDEMPOTENCY_KEY_REUSED",
                "idempotency key was already used with a different payload",
            )),
        )
            .into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payments_repo.get(payment_id).await {
        Ok(Some(p)) => (
            StatusCode::OK,
            Json(PaymentView {
                payment_id: p.payment_id,
                amount_minor: p.amount_minor,
                currency: p.currency,
                status: p.status,
                version: p.version,
                last_transition_reason: p.last_transition_reason,
                created_at: p.created_at,
                updated_at: p.updated_at,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(err("PAYMENT_NOT_FOUND", "no payment with that id")),
        )
            .into_response(),
        Err(e) => {
            let (status, body) = internal(e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
