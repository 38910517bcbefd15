use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Processing => "PROCESSING",
            PaymentState::Succeeded => "SUCCEEDED",
            PaymentState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentState> {
        match s {
            "PENDING" => Some(PaymentState::Pending),
            "PROCESSING" => Some(PaymentState::Processing),
            "SUCCEEDED" => Some(PaymentState::Succeeded),
            "FAILED" => Some(PaymentState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Succeeded | PaymentState::Failed)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatePaymentRequest {
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub status: PaymentState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub payment_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentState,
    pub version: i64,
    pub last_transition_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
