//! API server entry point.

use api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore, ProductRepository, ShopStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workflow::{CheckoutRecovery, HttpPaymentGateway};

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

/// Finishes paid checkouts, then serves requests until shutdown.
async fn serve<S: ShopStore>(store: S, config: &Config, metrics_handle: PrometheusHandle) {
    match CheckoutRecovery::new(store.clone()).reconcile().await {
        Ok(report) => tracing::info!(
            completed = report.completed,
            failed = report.failed,
            "startup checkout recovery done"
        ),
        Err(e) => tracing::warn!(error = %e, "startup checkout recovery failed"),
    }

    let payment = HttpPaymentGateway::new(&config.payment_service_url);
    let state = api::create_default_state(store, payment);
    let app = api::create_app(state, metrics_handle, &config.cors_allowed_origin);

    let addr = config.addr();
    tracing::info!(%addr, payment_service = %config.payment_service_url, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open storage and serve
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let catalog = store
                .list_products()
                .await
                .expect("failed to read product catalog");
            if catalog.is_empty() {
                api::seed_demo_catalog(&store)
                    .await
                    .expect("failed to seed product catalog");
                tracing::info!("empty catalog, seeded demo products");
            }
            tracing::info!(products = catalog.len(), "using PostgreSQL storage");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            let store = InMemoryStore::with_products(api::demo_catalog()).await;
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            serve(store, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
