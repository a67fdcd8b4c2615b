//! Campus Marketplace
//!
//! Backend for a campus storefront where student vendors list food and
//! products, buyers place orders, and an admin verifies vendors.
//!
//! ## Features
//! - Product catalog with image uploads
//! - Checkout priced from the catalog, with per-line price snapshots
//! - Order status workflow with one-time stock decrement on completion
//! - Buyer/vendor registration and login
//! - Admin vendor verification and cascading vendor removal

use thiserror::Error;

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;
pub mod uploads;

use domain::aggregates::{CartError, OrderError, ProductError, UserError};
use domain::value_objects::{MoneyError, QuantityError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// A unique key already taken, such as a registered student number.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MarketError>;

impl From<CartError> for MarketError {
    fn from(e: CartError) -> Self { MarketError::Validation(e.to_string()) }
}

impl From<OrderError> for MarketError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownStatus(_) => MarketError::Validation(e.to_string()),
            OrderError::Terminal { .. } | OrderError::InvalidTransition { .. } => MarketError::InvalidState(e.to_string()),
        }
    }
}

impl From<ProductError> for MarketError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InsufficientStock { .. } => MarketError::InvalidState(e.to_string()),
            ProductError::MissingName | ProductError::TooLong { .. } | ProductError::PriceTooHigh(_) | ProductError::NegativeStock => {
                MarketError::Validation(e.to_string())
            }
        }
    }
}

impl From<UserError> for MarketError {
    fn from(e: UserError) -> Self { MarketError::Validation(e.to_string()) }
}

impl From<MoneyError> for MarketError {
    fn from(e: MoneyError) -> Self { MarketError::Validation(e.to_string()) }
}

impl From<QuantityError> for MarketError {
    fn from(e: QuantityError) -> Self { MarketError::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for MarketError {
    fn from(e: validator::ValidationErrors) -> Self { MarketError::Validation(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::aggregates::OrderStatus;

    #[test]
    fn test_error_kinds() {
        let terminal: MarketError = OrderError::Terminal { from: OrderStatus::Cancelled, to: OrderStatus::Ready }.into();
        assert!(matches!(terminal, MarketError::InvalidState(_)));
        let unknown: MarketError = OrderError::UnknownStatus("LOST".into()).into();
        assert!(matches!(unknown, MarketError::Validation(_)));
        let stock: MarketError = ProductError::InsufficientStock { product_id: 1, available: 0, requested: 2 }.into();
        assert!(matches!(stock, MarketError::InvalidState(_)));
        assert_eq!(MarketError::from(CartError::Empty).to_string(), "Order must contain at least one item");
    }
}
