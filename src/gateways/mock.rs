use crate::gateways::{ChargeOutcome, PaymentGateway};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Simulated processor. Settled outcomes are recorded per payment id and
/// replayed verbatim on repeat charges, which is the dedup contract the core
/// relies on. Retryable failures are not settled and re-evaluate.
pub struct MockGateway {
    pub behavior: String,
    settled: Mutex<HashMap<Uuid, ChargeOutcome>>,
    attempts: Mutex<HashMap<Uuid, u32>>,
}

impl MockGateway {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_string(),
            settled: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn evaluate(&self, payment_id: Uuid) -> ChargeOutcome {
        match self.behavior.as_str() {
            "ALWAYS_FATAL" => ChargeOutcome::FatalFailure {
                code: "MOCK_DECLINED".to_string(),
                message: "mock decline".to_string(),
            },
            "ALWAYS_RETRYABLE" => ChargeOutcome::RetryableFailure {
                code: "MOCK_TIMEOUT".to_string(),
                message: "mock timeout".to_string(),
            },
            "FLAKY_THEN_SUCCESS" => {
                let mut attempts = self.attempts.lock().unwrap();
                let seen = attempts.entry(payment_id).or_insert(0);
                *seen += 1;
                if *seen <= 2 {
                    ChargeOutcome::RetryableFailure {
                        code: "MOCK_TIMEOUT".to_string(),
                        message: format!("mock timeout, attempt {seen}"),
                    }
                } else {
                    ChargeOutcome::Success {
                        transaction_ref: format!("mock_txn_{payment_id}"),
                    }
                }
            }
            _ => ChargeOutcome::Success {
                transaction_ref: format!("mock_txn_{payment_id}"),
            },
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn charge(&self, payment_id: Uuid, _amount_minor: i64, _currency: &str) -> Result<ChargeOutcome> {
        if let Some(prior) = self.settled.lock().unwrap().get(&payment_id) {
            return Ok(prior.clone());
        }

        let outcome = self.evaluate(payment_id);
        if outcome.is_settled() {
            self.settled.lock().unwrap().insert(payment_id, outcome.clone());
        }
        Ok(outcome)
    }

    async fn lookup(&self, payment_id: Uuid) -> Result<Option<ChargeOutcome>> {
        Ok(self.settled.lock().unwrap().get(&payment_id).cloned())
    }
}
