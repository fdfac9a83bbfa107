//! API server entry point.

use std::sync::Arc;

use api::Config;
use domain::{CustomerProfile, Money, ProductRecord, UserId};
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tokio::sync::watch;
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

/// Connects to PostgreSQL when `DATABASE_URL` is set; otherwise starts an
/// in-memory store with a small demo catalog.
async fn open_store(config: &Config) -> Arc<dyn Store> {
    if let Some(url) = &config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .expect("failed to connect to PostgreSQL");
        let store = PostgresStore::new(pool);
        store
            .run_migrations()
            .await
            .expect("failed to run migrations");
        tracing::info!("using PostgreSQL store");
        return Arc::new(store);
    }

    let store = InMemoryStore::new();
    let demo_customer = UserId::new();
    store
        .insert_customer(CustomerProfile::new(demo_customer, "demo@example.com"))
        .await;
    for product in [
        ProductRecord::new("SKU-LAMP", "Desk lamp", Money::from_cents(100_000), 10),
        ProductRecord::new("SKU-MUG", "Coffee mug", Money::from_cents(1_500), 50),
    ] {
        store.insert_product(product).await;
    }
    tracing::info!(%demo_customer, "using in-memory store with demo data");
    Arc::new(store)
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the store and wire the application state
    let store = open_store(&config).await;
    let (state, dispatcher) =
        api::create_default_state(store, &config).expect("invalid cache configuration");

    // 4. Load the availability index; serving without it would reject every cart
    let loaded = state
        .index
        .rebuild(state.store.as_ref())
        .await
        .expect("failed to load product availability");
    tracing::info!(products = loaded, "availability index loaded");

    // 5. Start the notification dispatcher
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_rx));

    // 6. Serve
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

    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher_task.await {
        tracing::warn!(error = %e, "notification dispatcher ended abnormally");
    }

    tracing::info!("server shut down gracefully");
}
