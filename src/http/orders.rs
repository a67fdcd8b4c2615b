use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::extract::{PathId, ValidatedJson};
use super::AppState;
use crate::domain::aggregates::{Cart, CartLine, CustomerOrderSummary, Order, OrderId, OrderLine, OrderStatus, ProductId, UserId, VendorId, VendorOrderSummary};
use crate::domain::value_objects::Quantity;
use crate::services::orders;
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(alias = "customerUserId")]
    pub customer_id: UserId,
    pub vendor_id: VendorId,
    #[validate(length(min = 1, message = "deliveryLocation is required"))]
    pub delivery_location: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

/// A cart line. Any price the client sends along is ignored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CreateOrderRequest {
    fn into_cart(self) -> Result<Cart> {
        let lines = self.items.into_iter()
            .map(|item| Ok(CartLine { product_id: item.product_id, quantity: Quantity::new(item.quantity)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Cart::new(self.customer_id, self.vendor_id, self.delivery_location, self.payment_method, lines)?)
    }
}

/// Accepts `{"status": "READY"}` or a bare `"READY"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StatusRequest {
    Object { status: String },
    Bare(String),
}

impl StatusRequest {
    fn status(&self) -> &str {
        match self {
            StatusRequest::Object { status } | StatusRequest::Bare(status) => status,
        }
    }
}

impl Validate for StatusRequest {
    fn validate(&self) -> std::result::Result<(), validator::ValidationErrors> {
        if !self.status().trim().is_empty() {
            return Ok(());
        }
        let mut errors = validator::ValidationErrors::new();
        errors.add("status", validator::ValidationError::new("required"));
        Err(errors)
    }
}

pub async fn create_order(State(s): State<AppState>, ValidatedJson(req): ValidatedJson<CreateOrderRequest>) -> Result<(StatusCode, Json<Value>)> {
    let order = orders::place_order(s.store.as_ref(), &s.publisher, req.into_cart()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "orderId": order.order_id, "total": order.total_amount }))))
}

pub async fn get_order(State(s): State<AppState>, PathId(id): PathId<OrderId>) -> Result<Json<Order>> {
    Ok(Json(orders::get_order(s.store.as_ref(), id).await?))
}

pub async fn order_items(State(s): State<AppState>, PathId(id): PathId<OrderId>) -> Result<Json<Vec<OrderLine>>> {
    Ok(Json(orders::order_items(s.store.as_ref(), id).await?))
}

pub async fn update_status(State(s): State<AppState>, PathId(id): PathId<OrderId>, ValidatedJson(req): ValidatedJson<StatusRequest>) -> Result<Json<Value>> {
    let next: OrderStatus = req.status().parse()?;
    let status = orders::change_status(s.store.as_ref(), &s.publisher, id, next).await?;
    Ok(Json(json!({ "orderId": id, "status": status })))
}

pub async fn vendor_orders(State(s): State<AppState>, PathId(vendor_id): PathId<VendorId>) -> Result<Json<Vec<VendorOrderSummary>>> {
    Ok(Json(orders::vendor_orders(s.store.as_ref(), vendor_id).await?))
}

pub async fn customer_orders(State(s): State<AppState>, PathId(customer_id): PathId<UserId>) -> Result<Json<Vec<CustomerOrderSummary>>> {
    Ok(Json(orders::customer_orders(s.store.as_ref(), customer_id).await?))
}
