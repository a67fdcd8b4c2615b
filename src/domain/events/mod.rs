//! Domain events
use serde::Serialize;
use crate::domain::aggregates::{OrderId, OrderStatus, UserId, VendorId, VerificationStatus};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    OrderPlaced { order_id: OrderId, customer_id: UserId, vendor_id: VendorId, total: Money },
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    #[serde(rename_all = "camelCase")]
    VendorVerificationChanged { vendor_id: VendorId, status: VerificationStatus },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "market.orders.placed",
            Self::OrderStatusChanged { .. } => "market.orders.status_changed",
            Self::VendorVerificationChanged { .. } => "market.vendors.verification_changed",
        }
    }
}
