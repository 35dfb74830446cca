use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::*;
use crate::ports::DonationRepositoryPort;

pub fn create_router<R: DonationRepositoryPort + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/payments/checkout", post(checkout))
        .route("/api/payments/momo/return", get(momo_return))
        .route("/api/payments/momo/notify", post(momo_notify))
        .route("/api/payments/vnpay/return", get(vnpay_return))
        .route("/api/payments/vnpay/notify", post(vnpay_notify))
        .route("/api/payments/paypal/return", get(paypal_return))
        .route("/api/payments/paypal/cancel", get(paypal_cancel))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
