use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{error, info};

use crate::application::{CheckoutRequest, ErrorResponse, PaymentService};
use crate::domain::errors::DomainError;
use crate::domain::{CallbackChannel, PaymentProvider};
use crate::ports::DonationRepositoryPort;

/// Application state shared across handlers.
pub struct AppState<R: DonationRepositoryPort> {
    pub payment_service: std::sync::Arc<PaymentService<R>>,
}

impl<R: DonationRepositoryPort> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(error: DomainError) -> ApiError {
    error!("Payment error: {error}");
    let status = match error {
        DomainError::ValidationError(_) | DomainError::UnsupportedProvider(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::DonationNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ConfigurationError(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::ProviderError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse::new("PAYMENT_ERROR", error.to_string())),
    )
}

/// Webhook parameters may arrive on the query string, in a form-encoded
/// body, or split across both; query entries win on conflicts.
fn merge_form_params(query: HashMap<String, String>, body: &str) -> HashMap<String, String> {
    let mut params: HashMap<String, String> =
        serde_urlencoded::from_str(body).unwrap_or_default();
    params.extend(query);
    params
}

/// Flattens a JSON webhook body into string parameters. Non-string scalars
/// (MoMo sends `resultCode` as a number) keep their literal rendering.
fn json_to_params(payload: &serde_json::Value) -> HashMap<String, String> {
    payload
        .as_object()
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

pub async fn checkout<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received checkout request for {}", request.payment_method);
    state
        .payment_service
        .checkout(request, addr.ip().to_string())
        .await
        .map(|response| (StatusCode::OK, Json(response)))
        .map_err(error_response)
}

pub async fn momo_return<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    state
        .payment_service
        .handle_return(PaymentProvider::Momo, CallbackChannel::Return, &params)
        .await
        .map(|url| Redirect::to(&url))
        .map_err(error_response)
}

pub async fn momo_notify<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received MoMo notify webhook");
    state
        .payment_service
        .handle_notify(PaymentProvider::Momo, &json_to_params(&payload))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn vnpay_return<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    state
        .payment_service
        .handle_return(PaymentProvider::Bank, CallbackChannel::Return, &params)
        .await
        .map(|url| Redirect::to(&url))
        .map_err(error_response)
}

pub async fn vnpay_notify<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received VNPay notify webhook");
    state
        .payment_service
        .handle_notify(PaymentProvider::Bank, &merge_form_params(query, &body))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn paypal_return<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    state
        .payment_service
        .handle_return(PaymentProvider::Paypal, CallbackChannel::Return, &params)
        .await
        .map(|url| Redirect::to(&url))
        .map_err(error_response)
}

pub async fn paypal_cancel<R: DonationRepositoryPort>(
    State(state): State<AppState<R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    state
        .payment_service
        .handle_return(PaymentProvider::Paypal, CallbackChannel::Cancel, &params)
        .await
        .map(|url| Redirect::to(&url))
        .map_err(error_response)
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
