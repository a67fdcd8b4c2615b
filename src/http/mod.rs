//! HTTP surface: axum router and handlers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::publisher::EventPublisher;
use crate::store::MarketStore;
use crate::uploads::ImageStore;

pub mod error;
pub mod extract;
mod orders;
mod products;
mod users;
mod vendors;

/// Largest accepted request body; image uploads are the big ones.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub images: Arc<ImageStore>,
    pub publisher: EventPublisher,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/vendor/:id", get(products::vendor_products))
        .route("/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .route("/orders", post(orders::create_order))
        .route("/orders/vendor/:id", get(orders::vendor_orders))
        .route("/orders/customer/:id", get(orders::customer_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/items", get(orders::order_items))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/vendors/:id/open", put(vendors::set_shop_open))
        .route("/admin/vendors", get(vendors::list_vendors))
        .route("/admin/vendors/:id", delete(vendors::delete_vendor))
        .route("/admin/vendors/:id/verification", put(vendors::set_verification));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.images.dir()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "campus-market" }))
}
