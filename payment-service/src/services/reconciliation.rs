//! Payment creation and provider-driven reconciliation.
//!
//! A payment is created by pricing the order, asking the provider for a QR
//! code and storing a pending record. Provider notifications are reconciled by
//! querying the provider, approving the matching payment and moving the order
//! along. Neither workflow compensates earlier steps when a later one fails.

use std::sync::Arc;

use super::error::PaymentError;
use super::line_items::LineItemAggregator;
use super::metrics::{record_payment_created, record_webhook};
use super::peers::OrderService;
use super::provider::{ProviderStatus, QrCodeProvider};
use super::repository::PaymentStore;
use crate::models::Payment;

/// Order status pushed to the order service once its payment is approved.
pub const ORDER_STATUS_RECEIVED: &str = "RECEIVED";

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    line_items: LineItemAggregator,
    provider: Arc<dyn QrCodeProvider>,
    orders: Arc<dyn OrderService>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        line_items: LineItemAggregator,
        provider: Arc<dyn QrCodeProvider>,
        orders: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            store,
            line_items,
            provider,
            orders,
        }
    }

    /// Create a pending payment with a fresh QR code for `order_id`.
    pub async fn create_by_order_id(&self, order_id: &str) -> Result<Payment, PaymentError> {
        let result = self.create(order_id).await;
        match &result {
            Ok(payment) => {
                record_payment_created("created");
                tracing::info!(
                    order_id = %order_id,
                    payment_id = %payment.id,
                    "Payment created"
                );
            }
            Err(e) => {
                record_payment_created(e.kind());
                tracing::error!(order_id = %order_id, error = %e, "Payment creation failed");
            }
        }
        result
    }

    async fn create(&self, order_id: &str) -> Result<Payment, PaymentError> {
        let items = self.line_items.aggregate(order_id).await?;
        let qr_code = self.provider.generate_qr_code(order_id, &items).await?;
        self.store.create(Payment::new(order_id, qr_code)).await
    }

    /// Reconcile a provider notification pointing at `status_url`.
    ///
    /// The provider response is returned unchanged whether or not it led to an
    /// approval.
    pub async fn check_payment(&self, status_url: &str) -> Result<ProviderStatus, PaymentError> {
        let result = self.reconcile(status_url).await;
        match &result {
            Ok(status) if status.is_paid() => record_webhook("approved"),
            Ok(_) => record_webhook("ignored"),
            Err(e) => {
                record_webhook(e.kind());
                tracing::error!(resource = %status_url, error = %e, "Payment check failed");
            }
        }
        result
    }

    async fn reconcile(&self, status_url: &str) -> Result<ProviderStatus, PaymentError> {
        if status_url.trim().is_empty() {
            return Err(PaymentError::Validation("resource URL must not be empty".into()));
        }

        let status = self.provider.check_payment(status_url).await?;
        let mut payment = self.store.find_by_order_id(&status.external_reference).await?;

        if !status.is_paid() {
            tracing::info!(
                order_id = %status.external_reference,
                order_status = %status.order_status,
                "Payment not paid yet, nothing to reconcile"
            );
            return Ok(status);
        }

        // Not transactional: a failure below leaves the payment approved.
        payment.approve();
        let payment = self.store.update(payment).await?;
        tracing::info!(
            order_id = %payment.order_id,
            payment_id = %payment.id,
            "Payment approved"
        );

        let mut order = self.orders.find_by_id(&payment.order_id).await?;
        order.status = ORDER_STATUS_RECEIVED.to_string();
        self.orders.update(order).await?;

        Ok(status)
    }

    pub async fn list_payments(&self) -> Result<Vec<Payment>, PaymentError> {
        self.store.get_all().await
    }
}
