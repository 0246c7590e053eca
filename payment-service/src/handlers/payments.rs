use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::dtos::{CheckPaymentRequest, CreatePaymentRequest, PaymentListResponse, PaymentResponse};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_payment(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state.payments.create_by_order_id(&payload.order_id).await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let payments = state.payments.list_payments().await?;
    Ok(Json(PaymentListResponse::from(payments)))
}

/// Provider notification webhook. Answers with an empty 200 once processed,
/// whether the payment was approved or left untouched.
pub async fn check_payment(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CheckPaymentRequest>,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        resource = %payload.resource,
        topic = %payload.topic,
        "Payment notification received"
    );

    state.payments.check_payment(&payload.resource).await?;
    Ok(StatusCode::OK)
}
