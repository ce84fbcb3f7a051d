//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::Config;
use api::routes::billing::AppState;
use billing::{
    AccountProvisioningSaga, BillingQueries, MaintenanceJobs, PricingEngine, PurchaseSaga,
    SnapshotResolver, UsageHandler,
};
use cache::RedisCache;
use domain::PostgresStore;
use events::{ConnectionHealth, EventEmitter, KafkaSink};
use provider::LagoClient;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = Config::from_env();

    // 3. Relational store
    let database_url = config
        .database_url
        .clone()
        .expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("failed to connect to Postgres");
    let store = PostgresStore::new(pool);
    store
        .run_migrations()
        .await
        .expect("database migrations failed");

    // 4. Billing provider
    let lago_url = config.lago_url.clone().expect("LAGO_URL must be set");
    let lago_api_key = config
        .lago_api_key
        .clone()
        .expect("LAGO_API_KEY must be set");
    let provider =
        LagoClient::new(lago_url, lago_api_key).expect("failed to build provider client");

    // 5. Snapshot cache
    let cache = RedisCache::new(&config.redis_url).expect("failed to build redis pool");

    // 6. Event broker: connectivity is confirmed once, here; the emitter
    //    checks the health handle per publish and never re-verifies.
    let health = ConnectionHealth::new();
    let brokers = config
        .kafka_brokers
        .clone()
        .unwrap_or_else(|| "localhost:9092".to_string());
    let sink = KafkaSink::connect(&brokers, &config.kafka_client_id)
        .expect("failed to build kafka producer");
    if config.kafka_enabled {
        match sink.verify_connectivity(Duration::from_secs(5)) {
            Ok(()) => {
                health.mark_ready();
                tracing::info!(brokers = %brokers, "kafka producer connected");
            }
            Err(e) => {
                health.mark_failed(e.to_string());
                tracing::error!(error = %e, "kafka producer connect failed");
            }
        }
    } else {
        health.mark_failed("kafka disabled by configuration");
        tracing::warn!("kafka disabled; domain events will not be emitted");
    }
    let emitter = EventEmitter::new(sink, health);

    // 7. Application state
    let state = Arc::new(AppState {
        purchase: PurchaseSaga::new(
            store.clone(),
            provider.clone(),
            emitter.clone(),
            config.product_name.clone(),
        ),
        pricing: PricingEngine::new(SnapshotResolver::new(
            cache.clone(),
            provider.clone(),
            store.clone(),
        )),
        queries: BillingQueries::new(store.clone(), provider.clone()),
    });

    // 8. Event consumer
    if config.kafka_enabled {
        let provisioning = AccountProvisioningSaga::new(store.clone(), provider.clone());
        let usage = UsageHandler::new(
            store.clone(),
            provider.clone(),
            config.product_name.clone(),
        );
        let consumer_brokers = brokers.clone();
        let group_id = config.kafka_group_id.clone();
        tokio::spawn(async move {
            if let Err(e) =
                api::consumer::run_consumer(&consumer_brokers, &group_id, provisioning, usage)
                    .await
            {
                tracing::error!(error = %e, "event consumer exited");
            }
        });
    }

    // 9. Periodic maintenance jobs
    let jobs = Arc::new(MaintenanceJobs::new(
        provider.clone(),
        cache.clone(),
        store.clone(),
        emitter.clone(),
        Some(config.cache_ttl),
    ));
    {
        let jobs = jobs.clone();
        let mut ticker = tokio::time::interval(config.expiry_job_interval);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = jobs.terminate_expired_subscriptions().await {
                    tracing::error!(error = %e, "error terminating expired subscriptions");
                }
                if let Err(e) = jobs.terminate_expired_coupons().await {
                    tracing::error!(error = %e, "error terminating expired coupons");
                }
            }
        });
    }
    {
        let jobs = jobs.clone();
        let mut ticker = tokio::time::interval(config.refresh_job_interval);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(e) = jobs.refresh_product_cache().await {
                    tracing::error!(error = %e, "error refreshing product cache");
                }
                if let Err(e) = jobs.refresh_plan_cache().await {
                    tracing::error!(error = %e, "error refreshing plan cache");
                }
                if let Err(e) = jobs.refresh_coupon_cache().await {
                    tracing::error!(error = %e, "error refreshing coupon cache");
                }
            }
        });
    }

    // 10. Serve
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
