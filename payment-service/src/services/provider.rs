//! QR-code payment provider client.
//!
//! Implements Mercado Pago's in-store order API: a dynamic QR code is
//! generated per order, and the provider later notifies us with a resource
//! URL we query for the order status.

use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::{Decimal, RoundingStrategy};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;

use super::error::PaymentError;
use super::http::read_json;
use crate::config::ProviderConfig;
use crate::models::LineItem;

/// Provider order status meaning the customer has paid.
pub const PAID_STATUS: &str = "paid";

const UNIT_MEASURE: &str = "unit";

#[async_trait]
pub trait QrCodeProvider: Send + Sync {
    /// Register a payment request for the order and return the QR payload.
    async fn generate_qr_code(&self, order_id: &str, items: &[LineItem]) -> Result<String, PaymentError>;

    /// Query a status URL delivered through a provider notification.
    async fn check_payment(&self, status_url: &str) -> Result<ProviderStatus, PaymentError>;
}

/// Provider view of an order's payment state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub external_reference: String,
    pub order_status: String,
}

impl ProviderStatus {
    pub fn is_paid(&self) -> bool {
        self.order_status == PAID_STATUS
    }
}

/// Round a currency value to cents, half away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Body of the QR-code generation request.
#[derive(Debug, Serialize, PartialEq)]
pub struct GenerateQrCodeRequest {
    pub title: String,
    pub description: String,
    pub external_reference: String,
    pub items: Vec<QrCodeItem>,
    pub notification_url: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QrCodeItem {
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub unit_measure: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sku_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl GenerateQrCodeRequest {
    /// Every currency value is rounded on its own; the total is the rounded
    /// sum of the already rounded item amounts. Fails if that sum overflows.
    pub fn new(
        order_id: &str,
        items: &[LineItem],
        notification_url: &str,
    ) -> Result<Self, PaymentError> {
        let items: Vec<QrCodeItem> = items
            .iter()
            .map(|item| QrCodeItem {
                title: item.name.clone(),
                unit_price: round_currency(item.unit_price),
                quantity: item.quantity,
                unit_measure: UNIT_MEASURE.to_string(),
                total_amount: round_currency(item.amount),
                sku_number: String::new(),
                category: String::new(),
                description: item.name.clone(),
            })
            .collect();

        let total = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total_amount))
            .ok_or_else(|| PaymentError::Amount(format!("total of order {}", order_id)))?;

        Ok(Self {
            title: format!("Order {}", order_id),
            description: format!("Order Description {}", order_id),
            external_reference: order_id.to_string(),
            items,
            notification_url: notification_url.to_string(),
            total_amount: round_currency(total),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateQrCodeResponse {
    #[serde(default)]
    in_store_order_id: String,
    qr_data: String,
}

/// Substitute `{key}` placeholders in a path template.
///
/// Fails when a supplied key has no placeholder in the template, or when a
/// placeholder is left without a value.
pub fn build_path(template: &str, params: &[(&str, &str)]) -> Result<String, PaymentError> {
    let mut path = template.to_string();

    for (key, value) in params {
        let placeholder = format!("{{{}}}", key);
        if !path.contains(&placeholder) {
            return Err(PaymentError::Configuration(format!(
                "placeholder {} not found in path template",
                placeholder
            )));
        }
        path = path.replace(&placeholder, value);
    }

    if let Some(start) = path.find('{') {
        let rest = &path[start..];
        let unresolved = rest.find('}').map(|end| &rest[..=end]).unwrap_or(rest);
        return Err(PaymentError::Configuration(format!(
            "no value supplied for placeholder {} in path template",
            unresolved
        )));
    }

    Ok(path)
}

/// Mercado Pago client for QR generation and order status checks.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    config: ProviderConfig,
}

impl MercadoPagoClient {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// Check if the provider is configured (credentials and POS are set).
    pub fn is_configured(&self) -> bool {
        !self.config.base_url.is_empty()
            && !self.config.access_token.expose_secret().is_empty()
            && !self.config.seller_user_id.is_empty()
            && !self.config.external_pos_id.is_empty()
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn qr_code_url(&self) -> Result<String, PaymentError> {
        let path = build_path(
            &self.config.qr_code_path,
            &[
                ("seller_user_id", self.config.seller_user_id.as_str()),
                ("external_pos_id", self.config.external_pos_id.as_str()),
            ],
        )?;
        Ok(format!("{}{}", self.base_url(), path))
    }

    /// The configured base host (with its port) and every `trusted_hosts` entry.
    fn is_trusted(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        let is_base = Url::parse(&self.config.base_url)
            .map(|base| {
                base.host_str() == Some(host)
                    && base.port_or_known_default() == url.port_or_known_default()
            })
            .unwrap_or(false);

        is_base
            || self
                .config
                .trusted_hosts
                .iter()
                .any(|trusted| trusted.eq_ignore_ascii_case(host))
    }

    /// Absolute status URLs are used as-is, relative ones hang off the base URL.
    /// The second value says whether the access token may be sent there.
    fn resolve_status_url(&self, status_url: &str) -> (String, bool) {
        match Url::parse(status_url) {
            Ok(url) => {
                let trusted = self.is_trusted(&url);
                (url.to_string(), trusted)
            }
            Err(_) => {
                let path = if status_url.starts_with('/') {
                    status_url.to_string()
                } else {
                    format!("/{}", status_url)
                };
                (format!("{}{}", self.base_url(), path), true)
            }
        }
    }
}

#[async_trait]
impl QrCodeProvider for MercadoPagoClient {
    async fn generate_qr_code(&self, order_id: &str, items: &[LineItem]) -> Result<String, PaymentError> {
        let url = self.qr_code_url()?;
        let request = GenerateQrCodeRequest::new(order_id, items, &self.config.notification_url)?;

        if request.items.is_empty() {
            tracing::warn!(order_id = %order_id, "Generating QR code for an order without items");
        }

        tracing::debug!(
            order_id = %order_id,
            endpoint = %url,
            total_amount = %request.total_amount,
            notification_url = %request.notification_url,
            "Requesting QR code"
        );

        let sent = self
            .client
            .traced_post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&request)
            .send()
            .await;
        let response: GenerateQrCodeResponse = read_json(&url, sent).await?;

        if response.qr_data.is_empty() {
            return Err(PaymentError::upstream_rejected(&url, "provider returned empty qr_data"));
        }

        tracing::info!(
            order_id = %order_id,
            in_store_order_id = %response.in_store_order_id,
            "QR code generated"
        );

        Ok(response.qr_data)
    }

    async fn check_payment(&self, status_url: &str) -> Result<ProviderStatus, PaymentError> {
        let (url, trusted) = self.resolve_status_url(status_url);

        let request = self.client.traced_get(&url);
        let request = if trusted {
            request.bearer_auth(self.config.access_token.expose_secret())
        } else {
            tracing::warn!(endpoint = %url, "Status URL host is not trusted, sending without credentials");
            request
        };

        let status: ProviderStatus = read_json(&url, request.send().await).await?;

        tracing::info!(
            external_reference = %status.external_reference,
            order_status = %status.order_status,
            "Provider payment status fetched"
        );

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::Secret;
    use serde_json::json;

    fn test_config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            qr_code_path: "/mocked-path/{seller_user_id}/{external_pos_id}".to_string(),
            seller_user_id: "userid_12".to_string(),
            external_pos_id: "posid_34".to_string(),
            access_token: Secret::new("token".to_string()),
            notification_url: String::new(),
            trusted_hosts: vec!["api.mercadolibre.com".to_string()],
        }
    }

    #[test]
    fn request_body_rounds_each_value() {
        let items = vec![
            LineItem::try_new("itemId", "itemName", dec!(12.3), 1).unwrap(),
            LineItem::try_new("itemId2", "itemName2", dec!(45.6), 2).unwrap(),
        ];

        let request = GenerateQrCodeRequest::new("orderId", &items, "").unwrap();
        let body = serde_json::to_value(request).unwrap();

        assert_eq!(
            body,
            json!({
                "title": "Order orderId",
                "description": "Order Description orderId",
                "external_reference": "orderId",
                "notification_url": "",
                "total_amount": 103.5,
                "items": [
                    {
                        "title": "itemName",
                        "unit_price": 12.3,
                        "quantity": 1,
                        "unit_measure": "unit",
                        "total_amount": 12.3,
                        "description": "itemName"
                    },
                    {
                        "title": "itemName2",
                        "unit_price": 45.6,
                        "quantity": 2,
                        "unit_measure": "unit",
                        "total_amount": 91.2,
                        "description": "itemName2"
                    }
                ]
            })
        );
    }

    #[test]
    fn total_is_sum_of_rounded_amounts() {
        // 3 x 0.335 = 1.005 -> 1.01 per item; two items -> 2.02 (not round(2.01) = 2.01)
        let items = vec![
            LineItem::try_new("a", "A", dec!(0.335), 3).unwrap(),
            LineItem::try_new("b", "B", dec!(0.335), 3).unwrap(),
        ];

        let request = GenerateQrCodeRequest::new("o", &items, "").unwrap();

        assert_eq!(request.items[0].unit_price, dec!(0.34));
        assert_eq!(request.items[0].total_amount, dec!(1.01));
        assert_eq!(request.total_amount, dec!(2.02));
    }

    #[test]
    fn total_overflow_is_an_amount_error() {
        let items = vec![
            LineItem::try_new("a", "A", Decimal::MAX, 1).unwrap(),
            LineItem::try_new("b", "B", Decimal::MAX, 1).unwrap(),
        ];

        let err = GenerateQrCodeRequest::new("o", &items, "").unwrap_err();

        assert!(matches!(err, PaymentError::Amount(_)));
    }

    #[test]
    fn empty_items_total_zero() {
        let request = GenerateQrCodeRequest::new("o", &[], "http://hook").unwrap();
        assert!(request.items.is_empty());
        assert_eq!(request.total_amount, Decimal::ZERO);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_currency(dec!(2.675)), dec!(2.68));
        assert_eq!(round_currency(dec!(-2.675)), dec!(-2.68));
        assert_eq!(round_currency(dec!(2.674)), dec!(2.67));
    }

    #[test]
    fn build_path_substitutes_placeholders() {
        let path = build_path(
            "/api/v1/users/{user_id}/orders/{order_id}",
            &[("user_id", "123"), ("order_id", "456")],
        )
        .unwrap();
        assert_eq!(path, "/api/v1/users/123/orders/456");
    }

    #[test]
    fn build_path_rejects_missing_placeholder() {
        let err = build_path("invalid", &[("user_id", "123")]).unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }

    #[test]
    fn build_path_rejects_unresolved_placeholder() {
        let err = build_path("/pos/{external_pos_id}/{extra}", &[("external_pos_id", "1")])
            .unwrap_err();
        assert!(err.to_string().contains("{extra}"));
    }

    #[test]
    fn status_url_resolution() {
        let client = MercadoPagoClient::new(Client::new(), test_config("https://api.mercadopago.com/"));

        assert_eq!(
            client.resolve_status_url("/merchant_orders/1"),
            ("https://api.mercadopago.com/merchant_orders/1".to_string(), true)
        );
        assert_eq!(
            client.resolve_status_url("https://api.mercadopago.com/merchant_orders/2"),
            ("https://api.mercadopago.com/merchant_orders/2".to_string(), true)
        );
        assert!(!client.resolve_status_url("https://evil.example.com/x").1);
    }

    #[test]
    fn notification_resource_host_is_trusted() {
        let client = MercadoPagoClient::new(Client::new(), test_config("https://api.mercadopago.com"));

        let (url, trusted) =
            client.resolve_status_url("https://api.mercadolibre.com/merchant_orders/123");

        assert_eq!(url, "https://api.mercadolibre.com/merchant_orders/123");
        assert!(trusted);
    }

    #[test]
    fn trusted_hosts_are_configurable() {
        let mut config = test_config("https://api.mercadopago.com");
        config.trusted_hosts = Vec::new();
        let client = MercadoPagoClient::new(Client::new(), config);

        assert!(!client.resolve_status_url("https://api.mercadolibre.com/merchant_orders/123").1);
        assert!(client.resolve_status_url("https://api.mercadopago.com/merchant_orders/123").1);
    }

    #[test]
    fn test_is_configured() {
        assert!(MercadoPagoClient::new(Client::new(), test_config("http://mp")).is_configured());

        let mut config = test_config("http://mp");
        config.access_token = Secret::new(String::new());
        assert!(!MercadoPagoClient::new(Client::new(), config).is_configured());
    }

    #[test]
    fn paid_status_detection() {
        let status = ProviderStatus {
            external_reference: "o".into(),
            order_status: "paid".into(),
        };
        assert!(status.is_paid());
        assert!(!ProviderStatus {
            order_status: "payment_required".into(),
            ..status
        }
        .is_paid());
    }
}
