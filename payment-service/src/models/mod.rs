use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One payment attempt, tied 1:1 to an order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub order_id: String,
    pub qr_code: String,
    pub status: PaymentStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Payment {
    /// Build a new pending payment around a provider-issued QR code.
    pub fn new(order_id: impl Into<String>, qr_code: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            qr_code: qr_code.into(),
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the payment approved. Already approved payments stay approved.
    pub fn approve(&mut self) {
        self.status = PaymentStatus::Approved;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = DateTime::now();
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced order line, built per create request and dropped after the provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub amount: Decimal,
}

impl LineItem {
    /// `None` when `unit_price * quantity` does not fit in a `Decimal`.
    pub fn try_new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Option<Self> {
        let amount = unit_price.checked_mul(Decimal::from(quantity))?;
        Some(Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            amount,
        })
    }
}

/// Order-to-product association owned by the order service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderLine {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub order_id: String,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// Product metadata owned by the product service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub preparing_time: u32,
}

/// Order as seen through the order service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExternalOrder {
    pub id: String,
    pub status: String,
}
