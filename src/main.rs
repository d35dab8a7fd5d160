use outdial::application::{
    CallLifecycleService, CallScheduler, CallWorkerPool, CallbackWatchdog, CampaignMetricsService,
    CampaignService, GlobalMetricsService, SlotCoordinator, StartupSync,
};
use outdial::config::Config;
use outdial::domain::call::CallRequestRepository;
use outdial::domain::campaign::CampaignRepository;
use outdial::domain::coordination::CoordinationStore;
use outdial::domain::telephony::TelephonyGateway;
use outdial::infrastructure::coordination::InMemoryCoordinationStore;
use outdial::infrastructure::telephony::MockTelephonyGateway;
use outdial::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use outdial::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgCallRequestRepository, PgCampaignRepository,
};
#[cfg(not(feature = "postgres"))]
use outdial::infrastructure::persistence::{
    InMemoryCallRequestRepository, InMemoryCampaignRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Outdial campaign dispatcher");

    // Load configuration
    let config = Config::load();

    // Repositories (PostgreSQL when available, in-memory fallback)
    #[cfg(feature = "postgres")]
    let (campaign_repo, call_repo): (
        Arc<dyn CampaignRepository>,
        Arc<dyn CallRequestRepository>,
    ) = {
        info!("Initializing database connection...");
        let db_config = DatabaseConfig::from_env();
        let pool = create_pool(&db_config).await?;
        info!("Database connection pool created");

        info!("Running database migrations...");
        run_migrations(&pool).await?;
        info!("Database migrations completed");

        (
            Arc::new(PgCampaignRepository::new(pool.clone())),
            Arc::new(PgCallRequestRepository::new(pool)),
        )
    };

    #[cfg(not(feature = "postgres"))]
    let (campaign_repo, call_repo): (
        Arc<dyn CampaignRepository>,
        Arc<dyn CallRequestRepository>,
    ) = {
        info!("Running with in-memory repositories");
        (
            Arc::new(InMemoryCampaignRepository::new()),
            Arc::new(InMemoryCallRequestRepository::new()),
        )
    };

    // Coordination store and slot accounting
    let store: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
    let slots = Arc::new(SlotCoordinator::new(
        Arc::clone(&store),
        Duration::from_secs(config.metrics.ttl_hours * 3600),
    ));

    // Telephony gateway feeding callbacks through a channel
    let (callback_tx, mut callback_rx) = mpsc::unbounded_channel();
    let gateway: Arc<dyn TelephonyGateway> = Arc::new(MockTelephonyGateway::new(
        config.telephony.clone(),
        callback_tx,
    ));

    let lifecycle = Arc::new(CallLifecycleService::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        gateway,
        Arc::clone(&slots),
    ));

    // Drain provider callbacks into the lifecycle service
    {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            while let Some(event) = callback_rx.recv().await {
                if let Err(e) = lifecycle.handle_callback(event).await {
                    error!("Failed to process provider callback: {}", e);
                }
            }
        });
    }

    // Reconcile coordination state before anything starts consuming it
    StartupSync::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        Arc::clone(&store),
        Arc::clone(&slots),
    )
    .run()
    .await?;

    // Worker pool
    let worker_pool = Arc::new(CallWorkerPool::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        Arc::clone(&store),
        Arc::clone(&slots),
        Arc::clone(&lifecycle),
        config.worker.clone(),
    ));
    worker_pool.start();

    // Scheduling loop
    let scheduler = Arc::new(CallScheduler::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        Arc::clone(&store),
        Arc::clone(&slots),
        config.scheduler.clone(),
    ));
    {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }

    // Callback watchdog
    let watchdog = CallbackWatchdog::new(
        Arc::clone(&call_repo),
        Arc::clone(&lifecycle),
        config.scheduler.watchdog_interval_ms,
    );
    tokio::spawn(async move {
        watchdog.run().await;
    });

    // API
    let campaign_service = Arc::new(CampaignService::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        Arc::clone(&slots),
    ));
    let campaign_metrics = Arc::new(CampaignMetricsService::new(
        Arc::clone(&call_repo),
        Arc::clone(&slots),
    ));
    let global_metrics = Arc::new(GlobalMetricsService::new(
        Arc::clone(&campaign_repo),
        Arc::clone(&call_repo),
        Arc::clone(&slots),
        Arc::clone(&worker_pool),
    ));

    let prometheus_handle = init_metrics();
    let state = AppState {
        campaign_service,
        lifecycle: Arc::clone(&lifecycle),
        campaign_metrics,
        global_metrics,
    };
    let app = build_router(state, prometheus_handle, Arc::clone(&scheduler));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_pool.shutdown().await;
    info!("Outdial stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
