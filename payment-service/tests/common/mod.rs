#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use payment_service::config::{HttpClientConfig, ProviderConfig};
use payment_service::models::{ExternalOrder, LineItem, OrderLine, Product};
use payment_service::services::{
    build_client, InMemoryPaymentRepository, LineItemAggregator, MercadoPagoClient, OrderClient,
    OrderLineClient, OrderLineService, OrderService, PaymentError, PaymentService, ProductClient,
    ProductService, ProviderStatus, QrCodeProvider, ServiceIdentity,
};
use payment_service::{build_router, AppState};
use rust_decimal_macros::dec;
use secrecy::Secret;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const ORDER_ID: &str = "orderId";
pub const QR_DATA: &str = "00020101021243650016COM.MERCADOLIBRE";
pub const SELLER_USER_ID: &str = "userid_12";
pub const EXTERNAL_POS_ID: &str = "posid_34";
pub const ACCESS_TOKEN: &str = "test-access-token";
pub const SERVICE_KEY: &str = "test-service-key";

pub fn order_line(product_id: &str, quantity: u32) -> OrderLine {
    OrderLine {
        id: format!("line-{}", product_id),
        order_id: ORDER_ID.to_string(),
        product_id: product_id.to_string(),
        quantity,
        unit_price: Default::default(),
    }
}

/// (itemName, 12.3) x1 and (itemName2, 45.6) x2.
pub fn default_lines() -> Vec<OrderLine> {
    vec![order_line("itemId", 1), order_line("itemId2", 2)]
}

pub fn default_products() -> Vec<Product> {
    vec![
        Product {
            id: "itemId".to_string(),
            name: "itemName".to_string(),
            price: dec!(12.3),
            preparing_time: 5,
        },
        Product {
            id: "itemId2".to_string(),
            name: "itemName2".to_string(),
            price: dec!(45.6),
            preparing_time: 10,
        },
    ]
}

pub fn provider_status(order_status: &str) -> ProviderStatus {
    ProviderStatus {
        external_reference: ORDER_ID.to_string(),
        order_status: order_status.to_string(),
    }
}

pub struct FakeOrderLines {
    pub lines: Vec<OrderLine>,
}

#[async_trait]
impl OrderLineService for FakeOrderLines {
    async fn find_lines_by_order_id(&self, _order_id: &str) -> Result<Vec<OrderLine>, PaymentError> {
        if self.lines.is_empty() {
            return Err(PaymentError::upstream_rejected(
                "fake://order-lines",
                "order has no product lines",
            ));
        }
        Ok(self.lines.clone())
    }
}

pub struct FakeProducts {
    pub products: Vec<Product>,
    pub requested: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ProductService for FakeProducts {
    async fn find_by_ids(&self, product_ids: &[String]) -> Result<Vec<Product>, PaymentError> {
        self.requested.lock().unwrap().push(product_ids.to_vec());
        Ok(self
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

pub struct FakeProvider {
    pub qr_code: String,
    pub status: ProviderStatus,
    pub fail_generate: bool,
    pub generated: Mutex<Vec<(String, Vec<LineItem>)>>,
    pub checked: Mutex<Vec<String>>,
}

#[async_trait]
impl QrCodeProvider for FakeProvider {
    async fn generate_qr_code(&self, order_id: &str, items: &[LineItem]) -> Result<String, PaymentError> {
        self.generated
            .lock()
            .unwrap()
            .push((order_id.to_string(), items.to_vec()));
        if self.fail_generate {
            return Err(PaymentError::upstream_status("fake://provider/qrs", 500));
        }
        Ok(self.qr_code.clone())
    }

    async fn check_payment(&self, status_url: &str) -> Result<ProviderStatus, PaymentError> {
        self.checked.lock().unwrap().push(status_url.to_string());
        Ok(self.status.clone())
    }
}

pub struct FakeOrders {
    pub fail_update: bool,
    pub finds: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<ExternalOrder>>,
}

#[async_trait]
impl OrderService for FakeOrders {
    async fn find_by_id(&self, order_id: &str) -> Result<ExternalOrder, PaymentError> {
        self.finds.lock().unwrap().push(order_id.to_string());
        Ok(ExternalOrder {
            id: order_id.to_string(),
            status: "PENDING_PAYMENT".to_string(),
        })
    }

    async fn update(&self, order: ExternalOrder) -> Result<ExternalOrder, PaymentError> {
        if self.fail_update {
            return Err(PaymentError::upstream_status("fake://orders", 503));
        }
        self.updates.lock().unwrap().push(order.clone());
        Ok(order)
    }
}

/// Collaborator setup for a [`PaymentService`] built on fakes.
pub struct Fixture {
    pub lines: Vec<OrderLine>,
    pub products: Vec<Product>,
    pub qr_code: String,
    pub status: ProviderStatus,
    pub fail_generate: bool,
    pub fail_order_update: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            products: default_products(),
            qr_code: QR_DATA.to_string(),
            status: provider_status("paid"),
            fail_generate: false,
            fail_order_update: false,
        }
    }
}

pub struct Harness {
    pub service: Arc<PaymentService>,
    pub store: InMemoryPaymentRepository,
    pub products: Arc<FakeProducts>,
    pub provider: Arc<FakeProvider>,
    pub orders: Arc<FakeOrders>,
}

impl Fixture {
    pub fn build(self) -> Harness {
        let store = InMemoryPaymentRepository::new();
        let products = Arc::new(FakeProducts {
            products: self.products,
            requested: Mutex::new(Vec::new()),
        });
        let provider = Arc::new(FakeProvider {
            qr_code: self.qr_code,
            status: self.status,
            fail_generate: self.fail_generate,
            generated: Mutex::new(Vec::new()),
            checked: Mutex::new(Vec::new()),
        });
        let orders = Arc::new(FakeOrders {
            fail_update: self.fail_order_update,
            finds: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        });

        let line_items = LineItemAggregator::new(
            Arc::new(FakeOrderLines { lines: self.lines }),
            products.clone(),
        );
        let service = PaymentService::new(
            Arc::new(store.clone()),
            line_items,
            provider.clone(),
            orders.clone(),
        );

        Harness {
            service: Arc::new(service),
            store,
            products,
            provider,
            orders,
        }
    }
}

pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        qr_code_path: "/instore/orders/qr/seller/collectors/{seller_user_id}/pos/{external_pos_id}/qrs"
            .to_string(),
        seller_user_id: SELLER_USER_ID.to_string(),
        external_pos_id: EXTERNAL_POS_ID.to_string(),
        access_token: Secret::new(ACCESS_TOKEN.to_string()),
        notification_url: "https://payments.example.com/webhook/payment/check".to_string(),
        trusted_hosts: vec!["api.mercadolibre.com".to_string()],
    }
}

pub fn identity() -> ServiceIdentity {
    ServiceIdentity {
        name: "payment-service".to_string(),
        api_key: Some(Secret::new(SERVICE_KEY.to_string())),
    }
}

pub fn http_client() -> reqwest::Client {
    build_client(&HttpClientConfig::default()).expect("Failed to build HTTP client")
}

/// A running HTTP server whose peers and provider all live on one mock server.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryPaymentRepository,
}

impl TestApp {
    pub async fn spawn(mock_server: &MockServer) -> Self {
        let client = http_client();
        let base = mock_server.uri();

        let line_items = LineItemAggregator::new(
            Arc::new(OrderLineClient::new(client.clone(), &base, identity())),
            Arc::new(ProductClient::new(client.clone(), &base, identity())),
        );
        let store = InMemoryPaymentRepository::new();
        let service = PaymentService::new(
            Arc::new(store.clone()),
            line_items,
            Arc::new(MercadoPagoClient::new(client.clone(), provider_config(&base))),
            Arc::new(OrderClient::new(client, &base, identity())),
        );

        Self::serve(Arc::new(service), store).await
    }

    pub async fn spawn_with(harness: &Harness) -> Self {
        Self::serve(harness.service.clone(), harness.store.clone()).await
    }

    async fn serve(payments: Arc<PaymentService>, store: InMemoryPaymentRepository) -> Self {
        let router = build_router(AppState { payments });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            store,
        }
    }
}
