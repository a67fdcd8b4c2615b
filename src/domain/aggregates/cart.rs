//! Cart Aggregate
//!
//! A cart is the checkout payload: who buys, from which shop, and which
//! products in what quantities. It carries no prices. Pricing happens against
//! the catalog's current prices, producing a [`PricedOrder`] whose line prices
//! become the order's price snapshot.

use std::collections::HashMap;
use rust_decimal::Decimal;
use crate::domain::aggregates::user::UserId;
use crate::domain::aggregates::product::{ProductId, VendorId};
use crate::domain::value_objects::{Money, Quantity};

pub const DEFAULT_PAYMENT_METHOD: &str = "GCASH";
pub const MAX_PAYMENT_METHOD_CHARS: usize = 50;
/// 9,999,999,999.99, the widest total a `NUMERIC(12, 2)` column holds.
const MAX_TOTAL_CENTS: i64 = 999_999_999_999;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

#[derive(Clone, Debug)]
pub struct Cart {
    customer_id: UserId,
    vendor_id: VendorId,
    delivery_location: String,
    payment_method: String,
    lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price_at_order: Money,
}

impl PricedLine {
    pub fn line_total(&self) -> Money { self.price_at_order.multiply(self.quantity) }
}

#[derive(Clone, Debug)]
pub struct PricedOrder {
    pub customer_id: UserId,
    pub vendor_id: VendorId,
    pub delivery_location: String,
    pub payment_method: String,
    pub lines: Vec<PricedLine>,
    pub total: Money,
}

impl Cart {
    pub fn new(customer_id: UserId, vendor_id: VendorId, delivery_location: impl Into<String>, payment_method: Option<String>, lines: Vec<CartLine>) -> Result<Self, CartError> {
        if lines.is_empty() { return Err(CartError::Empty); }
        let delivery_location = delivery_location.into().trim().to_string();
        if delivery_location.is_empty() { return Err(CartError::MissingDeliveryLocation); }
        let payment_method = payment_method
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());
        if payment_method.chars().count() > MAX_PAYMENT_METHOD_CHARS { return Err(CartError::PaymentMethodTooLong); }
        Ok(Self { customer_id, vendor_id, delivery_location, payment_method, lines })
    }

    pub fn customer_id(&self) -> UserId { self.customer_id }
    pub fn vendor_id(&self) -> VendorId { self.vendor_id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }

    /// Distinct product ids referenced by the cart, ascending.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Prices every line from `prices`, the authoritative catalog prices.
    /// Fails on the first product missing from the catalog.
    pub fn price(&self, prices: &HashMap<ProductId, Money>) -> Result<PricedOrder, CartError> {
        let lines = self.lines.iter()
            .map(|line| {
                let price = prices.get(&line.product_id).copied().ok_or(CartError::UnknownProduct(line.product_id))?;
                Ok(PricedLine { product_id: line.product_id, quantity: line.quantity, price_at_order: price })
            })
            .collect::<Result<Vec<_>, CartError>>()?;
        let total: Money = lines.iter().map(PricedLine::line_total).sum();
        if total.amount() > Decimal::new(MAX_TOTAL_CENTS, 2) { return Err(CartError::TotalTooLarge(total)); }
        Ok(PricedOrder {
            customer_id: self.customer_id, vendor_id: self.vendor_id,
            delivery_location: self.delivery_location.clone(), payment_method: self.payment_method.clone(),
            lines, total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { Empty, MissingDeliveryLocation, PaymentMethodTooLong, UnknownProduct(ProductId), TotalTooLarge(Money) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Order must contain at least one item"),
            Self::MissingDeliveryLocation => write!(f, "Delivery location is required"),
            Self::PaymentMethodTooLong => write!(f, "Payment method must be at most {MAX_PAYMENT_METHOD_CHARS} characters"),
            Self::UnknownProduct(id) => write!(f, "Product ID {id} not found"),
            Self::TotalTooLarge(total) => write!(f, "Order total {total} is above the allowed maximum"),
        }
    }
}
