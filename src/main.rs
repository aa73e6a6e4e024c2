use std::sync::Arc;

use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use entitlement_sync::adapters::google_play::{
    GooglePlayBillingOracle, PlayBillingConfig, ServiceAccountTokenSource,
};
use entitlement_sync::adapters::http::{entitlement_router, EntitlementAppState};
use entitlement_sync::adapters::memory::InMemoryEntitlementStore;
use entitlement_sync::adapters::postgres::{
    self, PostgresNotificationLog, PostgresProcessedOrderRepository,
    PostgresSubscriptionRepository,
};
use entitlement_sync::adapters::scheduler::ExpirySweepScheduler;
use entitlement_sync::application::SweepExpiredSubscriptionsHandler;
use entitlement_sync::config::{AppConfig, ServerConfig};
use entitlement_sync::ports::{NotificationLog, ProcessedOrderRepository, SubscriptionRepository};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Stores {
    subscriptions: Arc<dyn SubscriptionRepository>,
    processed_orders: Arc<dyn ProcessedOrderRepository>,
    notification_log: Arc<dyn NotificationLog>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let stores = build_stores(&config).await?;

    // Billing oracle
    let http_client = reqwest::Client::builder()
        .timeout(config.billing.request_timeout())
        .build()?;
    let tokens = Arc::new(ServiceAccountTokenSource::new(
        config.billing.service_account_key_path.clone(),
        http_client.clone(),
    ));
    let billing_oracle = Arc::new(GooglePlayBillingOracle::new(
        PlayBillingConfig::from(&config.billing),
        http_client,
        tokens,
    ));

    // Background sweep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = if config.sweeper.enabled {
        let handler = SweepExpiredSubscriptionsHandler::new(stores.subscriptions.clone());
        let scheduler = ExpirySweepScheduler::new(Arc::new(handler), config.sweeper.interval());
        Some(tokio::spawn(async move { scheduler.run(shutdown_rx).await }))
    } else {
        tracing::warn!("Expiry sweeper disabled");
        None
    };

    let state = EntitlementAppState {
        subscriptions: stores.subscriptions,
        processed_orders: stores.processed_orders,
        notification_log: stores.notification_log,
        billing_oracle,
        package_name: config.billing.package_name.clone(),
        push_token: config
            .billing
            .push_token
            .clone()
            .map(|token| Arc::new(SecretString::new(token))),
    };
    let app = entitlement_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, package_name = %config.billing.package_name, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }
    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_new(&server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if server.is_production() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn build_stores(config: &AppConfig) -> Result<Stores, BoxError> {
    match &config.database {
        Some(database) => {
            let pool = postgres::connect(database).await?;
            tracing::info!("Using PostgreSQL entitlement store");
            Ok(Stores {
                subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
                processed_orders: Arc::new(PostgresProcessedOrderRepository::new(pool.clone())),
                notification_log: Arc::new(PostgresNotificationLog::new(pool)),
            })
        }
        None => {
            tracing::warn!("No database configured; using in-memory entitlement store");
            let store = InMemoryEntitlementStore::new();
            Ok(Stores {
                subscriptions: Arc::new(store.clone()),
                processed_orders: Arc::new(store.clone()),
                notification_log: Arc::new(store),
            })
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
