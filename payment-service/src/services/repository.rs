use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::options::{IndexOptions, ReplaceOptions};
use mongodb::{bson::doc, Collection, Database, IndexModel};
use tokio::sync::RwLock;

use super::error::PaymentError;
use crate::models::Payment;

/// Persistence for payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment, PaymentError>;

    /// Absent records and failed lookups both surface as `NotFound`.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Payment, PaymentError>;

    /// Full-record upsert by id. Refreshes `updated_at`.
    async fn update(&self, payment: Payment) -> Result<Payment, PaymentError>;

    async fn get_all(&self) -> Result<Vec<Payment>, PaymentError>;
}

fn not_found(order_id: &str) -> PaymentError {
    PaymentError::NotFound(format!("payment not found for order {}", order_id))
}

#[derive(Clone)]
pub struct PaymentRepository {
    collection: Collection<Payment>,
}

impl PaymentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("payments"),
        }
    }

    /// One payment per order.
    pub async fn init_indexes(&self) -> anyhow::Result<()> {
        let order_index = IndexModel::builder()
            .keys(doc! { "order_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_order_id_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.collection.create_indexes([order_index], None).await?;

        tracing::info!("Payment service indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment, PaymentError> {
        self.collection
            .insert_one(&payment, None)
            .await
            .map_err(|e| {
                tracing::error!(order_id = %payment.order_id, error = %e, "Failed to insert payment");
                PaymentError::Persistence(e.into())
            })?;
        Ok(payment)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Payment, PaymentError> {
        match self.collection.find_one(doc! { "order_id": order_id }, None).await {
            Ok(Some(payment)) => Ok(payment),
            Ok(None) => Err(not_found(order_id)),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Payment lookup failed");
                Err(not_found(order_id))
            }
        }
    }

    async fn update(&self, mut payment: Payment) -> Result<Payment, PaymentError> {
        payment.touch();

        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! { "_id": payment.id.as_str() }, &payment, options)
            .await
            .map_err(|e| {
                tracing::error!(payment_id = %payment.id, error = %e, "Failed to update payment");
                PaymentError::Persistence(e.into())
            })?;
        Ok(payment)
    }

    async fn get_all(&self) -> Result<Vec<Payment>, PaymentError> {
        let cursor = self
            .collection
            .find(None, None)
            .await
            .map_err(|e| PaymentError::Persistence(e.into()))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| PaymentError::Persistence(e.into()))
    }
}

/// Process-local store keyed by payment id, for tests and local runs.
///
/// Mirrors the unique `order_id` index of the Mongo collection.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<String, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment, PaymentError> {
        let mut payments = self.payments.write().await;
        if payments.values().any(|p| p.order_id == payment.order_id) {
            return Err(PaymentError::Persistence(anyhow!(
                "duplicate payment for order {}",
                payment.order_id
            )));
        }
        if payments.contains_key(&payment.id) {
            return Err(PaymentError::Persistence(anyhow!(
                "duplicate payment id {}",
                payment.id
            )));
        }
        payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Payment, PaymentError> {
        let payments = self.payments.read().await;
        payments
            .values()
            .find(|p| p.order_id == order_id)
            .cloned()
            .ok_or_else(|| not_found(order_id))
    }

    async fn update(&self, mut payment: Payment) -> Result<Payment, PaymentError> {
        payment.touch();
        let mut payments = self.payments.write().await;
        payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_all(&self) -> Result<Vec<Payment>, PaymentError> {
        let payments = self.payments.read().await;
        let mut all: Vec<Payment> = payments.values().cloned().collect();
        all.sort_by_key(|p| p.created_at);
        Ok(all)
    }
}
