//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use crate::domain::aggregates::product::{ProductId, VendorId};
use crate::domain::aggregates::user::UserId;
use crate::domain::value_objects::Money;

pub type OrderId = i64;
pub type OrderItemId = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus { #[default] Pending, Ready, Completed, Cancelled }

/// Outcome of checking a requested status change against the current status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one; nothing to write.
    Unchanged(OrderStatus),
    Moved { from: OrderStatus, to: OrderStatus },
}

impl Transition {
    /// True only for the single move into `Completed`, the one that takes stock.
    pub fn completes(&self) -> bool { matches!(self, Transition::Moved { to: OrderStatus::Completed, .. }) }
    pub fn status(&self) -> OrderStatus {
        match self { Transition::Unchanged(s) => *s, Transition::Moved { to, .. } => *to }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "PENDING", Self::Ready => "READY", Self::Completed => "COMPLETED", Self::Cancelled => "CANCELLED" }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }

    /// Re-applying the current status is accepted as a no-op, including on
    /// terminal orders. Any other move out of a terminal status, or back to
    /// `Pending`, is rejected.
    pub fn transition_to(self, next: OrderStatus) -> Result<Transition, OrderError> {
        use OrderStatus::*;
        if self == next { return Ok(Transition::Unchanged(self)); }
        match (self, next) {
            (Pending, Ready) | (Pending, Cancelled) | (Pending, Completed)
            | (Ready, Completed) | (Ready, Cancelled) => Ok(Transition::Moved { from: self, to: next }),
            (from, to) if from.is_terminal() => Err(OrderError::Terminal { from, to }),
            (from, to) => Err(OrderError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "READY" => Ok(Self::Ready),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub vendor_id: VendorId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub delivery_location: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Newest first: `created_at` descending, ties broken by id descending.
    pub fn newest_first(a: &Order, b: &Order) -> Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| b.order_id.cmp(&a.order_id))
    }
}

/// Persisted line item; its price is the snapshot taken when the order was placed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub order_item_id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price_at_order: Money,
}

/// Line item joined with the product it refers to, for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price_at_order: Money,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef { pub full_name: String }

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorOrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub customer: CustomerRef,
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub shop_name: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { Terminal { from: OrderStatus, to: OrderStatus }, InvalidTransition { from: OrderStatus, to: OrderStatus }, UnknownStatus(String) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal { from, to } => write!(f, "Order is already {from} and cannot move to {to}"),
            Self::InvalidTransition { from, to } => write!(f, "Order cannot move from {from} to {to}"),
            Self::UnknownStatus(s) => write!(f, "Unknown order status '{s}'"),
        }
    }
}
