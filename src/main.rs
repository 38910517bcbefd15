use axum::routing::{get, post};
use axum::Router;
use payments_engine::config::AppConfig;
use payments_engine::gateways::mock::MockGateway;
use payments_engine::gateways::PaymentGateway;
use payments_engine::repo::idempotency_repo::IdempotencyRepo;
use payments_engine::repo::jobs_repo::JobsRepo;
use payments_engine::repo::payments_repo::PaymentsRepo;
use payments_engine::service::admission::AdmissionService;
use payments_engine::service::concurrency::ConcurrencyController;
use payments_engine::service::ledger::IdempotencyLedger;
use payments_engine::service::processor::{BackoffPolicy, PaymentProcessor};
use payments_engine::service::reconciler::ReconciliationSweeper;
use payments_engine::service::worker::JobWorker;
use payments_engine::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let payments_repo = PaymentsRepo { pool: pool.clone() };
    let idempotency_repo = IdempotencyRepo { pool: pool.clone() };
    let jobs_repo = JobsRepo { pool: pool.clone() };

    let ledger = IdempotencyLedger {
        repo: idempotency_repo,
    };
    let concurrency = ConcurrencyController {
        payments_repo: payments_repo.clone(),
    };
    // One gateway instance shared by workers and the sweeper: the mock's
    // dedup record is per-process, the same way a real processor's would be
    // shared behind its API.
    let gateway: Arc<dyn PaymentGateway> = Arc::new(MockGateway::new(&cfg.mock_gateway_behavior));

    let processor = PaymentProcessor {
        payments_repo: payments_repo.clone(),
        concurrency: concurrency.clone(),
        gateway: gateway.clone(),
        backoff: BackoffPolicy {
            base_delay_ms: cfg.backoff_base_ms,
            multiplier: cfg.backoff_multiplier,
            max_delay_ms: cfg.backoff_max_ms,
            max_attempts: cfg.max_attempts,
        },
    };

    let worker = JobWorker {
        jobs_repo: jobs_repo.clone(),
        processor: processor.clone(),
        poll_interval_ms: cfg.worker_poll_ms,
        batch_size: cfg.worker_batch_size,
        reclaim_after_secs: cfg.job_reclaim_secs,
    };
    tokio::spawn(worker.run());

    let sweeper = ReconciliationSweeper {
        payments_repo: payments_repo.clone(),
        concurrency,
        gateway,
        staleness_secs: cfg.staleness_secs,
        sweep_interval_secs: cfg.sweep_interval_secs,
        batch_size: cfg.sweep_batch_size,
    };
    tokio::spawn(sweeper.run());

    let admission = AdmissionService {
        pool: pool.clone(),
        ledger,
    };

    let state = AppState {
        admission,
        payments_repo,
    };

    let app = Router::new()
        .route("/health", get(payments_engine::http::handlers::payments::health))
        .route("/payments", post(payments_engine::http::handlers::payments::create_payment))
        .route(
            "/payments/:payment_id",
            get(payments_engine::http::handlers::payments::get_payment),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
