//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// Payment status, shared by orders and payment rows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

/// Payment method that settles at checkout (no manual confirmation)
pub const PAYMENT_METHOD_ONLINE: &str = "online";
/// Cash on delivery
pub const PAYMENT_METHOD_COD: &str = "cod";

/// Whether `method` settles immediately and the order can be marked paid
pub fn settles_immediately(method: &str) -> bool {
    method.eq_ignore_ascii_case(PAYMENT_METHOD_ONLINE)
}

/// Order item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Unit price in currency unit
    pub price: f64,
    pub quantity: i32,
    /// `price * quantity`, computed server-side
    pub subtotal: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Assigned by the store on insert
    pub id: Option<i64>,
    pub buyer_id: i64,
    pub buyer_name: String,
    pub seller_id: i64,
    pub seller_username: String,
    pub status: OrderStatus,
    /// Total amount in currency unit
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub shipping_method: Option<String>,
    pub shipping_address: Option<String>,
    pub contact_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItem>,
}
