use std::net::SocketAddr;
use std::sync::Arc;

use parkline_api::{
    app,
    state::{AppState, AuthConfig, PaymentConfig},
    worker,
};
use parkline_core::repository::{BookingEngine, LotDirectory, VehicleLifecycle};
use parkline_store::{DbClient, StoreBookingEngine, StoreLotDirectory, StoreVehicleLifecycle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parkline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Parkline API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let bookings: Arc<dyn BookingEngine> = Arc::new(StoreBookingEngine::new(db.pool.clone()));
    let vehicles: Arc<dyn VehicleLifecycle> = Arc::new(StoreVehicleLifecycle::new(db.pool.clone()));
    let lots: Arc<dyn LotDirectory> = Arc::new(StoreLotDirectory::new(db.pool.clone()));

    let app_state = AppState {
        bookings,
        vehicles: vehicles.clone(),
        lots,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            admin_api_key: config.auth.admin_api_key.clone(),
        },
        payment: PaymentConfig {
            merchant_key: config.payment.merchant_key.clone(),
            merchant_salt: config.payment.merchant_salt.clone(),
            intent_secret: config.payment.intent_secret.clone(),
            intent_ttl_seconds: config.payment.intent_ttl_seconds,
            gateway_url: config.payment.gateway_url.clone(),
        },
    };

    tokio::spawn(worker::start_sweep_worker(
        vehicles,
        config.business_rules.sweep_interval_seconds,
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    db.close().await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install shutdown signal handler");
}
