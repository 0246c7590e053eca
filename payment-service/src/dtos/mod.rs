use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Payment, PaymentStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "order_id must not be empty"))]
    pub order_id: String,
}

/// Provider notification: `resource` is the URL to query for the order status.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckPaymentRequest {
    #[validate(length(min = 1, message = "resource must not be empty"))]
    pub resource: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub qr_code: String,
    pub status: PaymentStatus,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            qr_code: payment.qr_code,
            status: payment.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub total: usize,
    pub list: Vec<PaymentResponse>,
}

impl From<Vec<Payment>> for PaymentListResponse {
    fn from(payments: Vec<Payment>) -> Self {
        let list: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
        Self {
            total: list.len(),
            list,
        }
    }
}
