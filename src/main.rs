mod api;
mod application;
mod domain;
mod infrastructure;
mod ports;

use api::AppState;
use application::PaymentService;
use infrastructure::{MomoAdapter, MySqlDonationRepository, PaymentConfig, PaypalAdapter, VnpayAdapter};
use sqlx::MySqlPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    info!("Starting donation service...");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    info!("Connecting to database...");
    let pool = MySqlPool::connect(&database_url).await?;
    info!("Database connected successfully");

    let config = PaymentConfig::from_env();
    info!(
        "Payment providers enabled: momo={} vnpay={} paypal={}",
        config.momo.enabled, config.vnpay.enabled, config.paypal.enabled
    );

    let repository = Arc::new(MySqlDonationRepository::new(Arc::new(pool)));

    let payment_service = Arc::new(PaymentService::new(
        config.clone(),
        repository.clone(),
        Arc::new(MomoAdapter::new(config.clone())),
        Arc::new(VnpayAdapter::new(config.clone())),
        Arc::new(PaypalAdapter::new(config.clone(), repository.clone())),
    ));

    let app_state = AppState { payment_service };
    let app = api::create_router(app_state);

    let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("{}:{}", host, port);

    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /api/payments/checkout - Start a donation checkout");
    info!("  GET  /api/payments/momo/return - MoMo browser return");
    info!("  POST /api/payments/momo/notify - MoMo webhook");
    info!("  GET  /api/payments/vnpay/return - VNPay browser return");
    info!("  POST /api/payments/vnpay/notify - VNPay webhook");
    info!("  GET  /api/payments/paypal/return - PayPal capture return");
    info!("  GET  /api/payments/paypal/cancel - PayPal cancel return");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
