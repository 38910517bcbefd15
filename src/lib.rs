pub mod config;
pub mod domain {
    pub mod payment;
    pub mod state_machine;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod payments;
    }
}
pub mod repo {
    pub mod idempotency_repo;
    pub mod jobs_repo;
    pub mod payments_repo;
}
pub mod service {
    pub mod admission;
    pub mod concurrency;
    pub mod ledger;
    pub mod processor;
    pub mod reconciler;
    pub mod worker;
}

#[derive(Clone)]
pub struct AppState {
    pub admission: service::admission::AdmissionService,
    pub payments_repo: repo::payments_repo::PaymentsRepo,
}
