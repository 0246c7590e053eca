//! Peer service clients: order lines, products, and orders.
//!
//! Each capability is a trait so the reconciliation workflow can run against
//! fakes in tests; the HTTP implementations talk to the admin endpoints of
//! the order and product services.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use service_core::observability::{TracedClientExt, TracedRequest};

use super::error::PaymentError;
use super::http::read_peer_json;
use crate::config::PeersConfig;
use crate::models::{ExternalOrder, OrderLine, Product};

#[async_trait]
pub trait OrderLineService: Send + Sync {
    async fn find_lines_by_order_id(&self, order_id: &str) -> Result<Vec<OrderLine>, PaymentError>;
}

#[async_trait]
pub trait ProductService: Send + Sync {
    async fn find_by_ids(&self, product_ids: &[String]) -> Result<Vec<Product>, PaymentError>;
}

#[async_trait]
pub trait OrderService: Send + Sync {
    async fn find_by_id(&self, order_id: &str) -> Result<ExternalOrder, PaymentError>;
    async fn update(&self, order: ExternalOrder) -> Result<ExternalOrder, PaymentError>;
}

/// Identification headers attached to every peer request.
#[derive(Clone, Debug)]
pub struct ServiceIdentity {
    pub name: String,
    pub api_key: Option<Secret<String>>,
}

impl ServiceIdentity {
    fn apply(&self, request: TracedRequest) -> TracedRequest {
        let request = request
            .header("Content-Type", "application/json")
            .header("X-Service-Name", &self.name);
        match &self.api_key {
            Some(key) if !key.expose_secret().is_empty() => {
                request.header("X-Service-Key", key.expose_secret())
            }
            _ => request,
        }
    }
}

impl From<&PeersConfig> for ServiceIdentity {
    fn from(config: &PeersConfig) -> Self {
        Self {
            name: config.service_name.clone(),
            api_key: config.service_api_key.clone(),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// `GET {base}/admin/orders/{order_id}/products`
#[derive(Clone)]
pub struct OrderLineClient {
    client: Client,
    base_url: String,
    identity: ServiceIdentity,
}

impl OrderLineClient {
    pub fn new(client: Client, base_url: &str, identity: ServiceIdentity) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            identity,
        }
    }
}

#[async_trait]
impl OrderLineService for OrderLineClient {
    async fn find_lines_by_order_id(&self, order_id: &str) -> Result<Vec<OrderLine>, PaymentError> {
        let url = format!("{}/admin/orders/{}/products", self.base_url, order_id);

        let sent = self
            .identity
            .apply(self.client.traced_get(&url))
            .send()
            .await;
        let lines: Vec<OrderLine> = read_peer_json(&url, sent).await?;

        if lines.is_empty() {
            tracing::warn!(order_id = %order_id, "Order has no product lines");
            return Err(PaymentError::upstream_rejected(&url, "order has no product lines"));
        }

        tracing::debug!(order_id = %order_id, lines = lines.len(), "Fetched order lines");
        Ok(lines)
    }
}

#[derive(Serialize)]
struct ProductIdsRequest<'a> {
    product_ids: &'a [String],
}

/// `POST {base}/admin/products/by-ids`
#[derive(Clone)]
pub struct ProductClient {
    client: Client,
    base_url: String,
    identity: ServiceIdentity,
}

impl ProductClient {
    pub fn new(client: Client, base_url: &str, identity: ServiceIdentity) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            identity,
        }
    }
}

#[async_trait]
impl ProductService for ProductClient {
    async fn find_by_ids(&self, product_ids: &[String]) -> Result<Vec<Product>, PaymentError> {
        let url = format!("{}/admin/products/by-ids", self.base_url);

        let sent = self
            .identity
            .apply(self.client.traced_post(&url))
            .json(&ProductIdsRequest { product_ids })
            .send()
            .await;
        read_peer_json(&url, sent).await
    }
}

#[derive(Serialize)]
struct OrderStatusUpdate<'a> {
    status: &'a str,
}

/// `GET|PUT {base}/admin/orders/{id}`
#[derive(Clone)]
pub struct OrderClient {
    client: Client,
    base_url: String,
    identity: ServiceIdentity,
}

impl OrderClient {
    pub fn new(client: Client, base_url: &str, identity: ServiceIdentity) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            identity,
        }
    }
}

#[async_trait]
impl OrderService for OrderClient {
    async fn find_by_id(&self, order_id: &str) -> Result<ExternalOrder, PaymentError> {
        let url = format!("{}/admin/orders/{}", self.base_url, order_id);

        let sent = self
            .identity
            .apply(self.client.traced_get(&url))
            .send()
            .await;
        read_peer_json(&url, sent).await
    }

    async fn update(&self, order: ExternalOrder) -> Result<ExternalOrder, PaymentError> {
        let url = format!("{}/admin/orders/{}", self.base_url, order.id);

        let sent = self
            .identity
            .apply(self.client.traced_put(&url))
            .json(&OrderStatusUpdate {
                status: &order.status,
            })
            .send()
            .await;
        let updated: ExternalOrder = read_peer_json(&url, sent).await?;

        tracing::info!(order_id = %updated.id, status = %updated.status, "Order status updated");
        Ok(updated)
    }
}
