//! Product Aggregate

use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::value_objects::{Money, Quantity};

pub type ProductId = i64;
pub type VendorId = i64;

pub const DEFAULT_CATEGORY: &str = "Food";

pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_CATEGORY_CHARS: usize = 100;
/// 99,999,999.99, the widest price a `NUMERIC(10, 2)` column holds.
const MAX_PRICE_CENTS: i64 = 9_999_999_999;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i32,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A product as shown on the storefront, carrying its shop's name.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub product: Product,
    pub shop_name: String,
}

/// Editable product fields, shared by create and update.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductDetails {
    pub name: String,
    pub price: Money,
    pub stock_quantity: i32,
    pub category: String,
    pub description: Option<String>,
}

impl ProductDetails {
    pub fn new(name: impl Into<String>, price: Money, stock_quantity: i32, category: Option<String>, description: Option<String>) -> Result<Self, ProductError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if name.chars().count() > MAX_NAME_CHARS { return Err(ProductError::TooLong { field: "name", max: MAX_NAME_CHARS }); }
        if price.amount() > Decimal::new(MAX_PRICE_CENTS, 2) { return Err(ProductError::PriceTooHigh(price)); }
        if stock_quantity < 0 { return Err(ProductError::NegativeStock); }
        let category = category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if category.chars().count() > MAX_CATEGORY_CHARS { return Err(ProductError::TooLong { field: "category", max: MAX_CATEGORY_CHARS }); }
        let description = description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        Ok(Self { name, price, stock_quantity, category, description })
    }
}

impl Product {
    pub fn create(product_id: ProductId, vendor_id: VendorId, details: ProductDetails, image_url: Option<String>) -> Self {
        Self {
            product_id, vendor_id, name: details.name, price: details.price, stock_quantity: details.stock_quantity,
            category: details.category, description: details.description, image_url,
        }
    }

    /// Applies an edit. The image is only replaced when a new one was uploaded.
    pub fn apply(&mut self, details: ProductDetails, new_image: Option<String>) {
        self.name = details.name;
        self.price = details.price;
        self.stock_quantity = details.stock_quantity;
        self.category = details.category;
        self.description = details.description;
        if new_image.is_some() { self.image_url = new_image; }
    }

    pub fn has_stock_for(&self, qty: u32) -> bool { i64::from(self.stock_quantity) >= i64::from(qty) }

    pub fn remove_stock(&mut self, qty: Quantity) -> Result<(), ProductError> {
        if !self.has_stock_for(qty.value()) {
            return Err(ProductError::InsufficientStock { product_id: self.product_id, available: self.stock_quantity, requested: qty.value() });
        }
        self.stock_quantity -= qty.as_i32();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    MissingName,
    TooLong { field: &'static str, max: usize },
    PriceTooHigh(Money),
    NegativeStock,
    InsufficientStock { product_id: ProductId, available: i32, requested: u32 },
}
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::TooLong { field, max } => write!(f, "Product {field} must be at most {max} characters"),
            Self::PriceTooHigh(price) => write!(f, "Price {price} is above the allowed maximum"),
            Self::NegativeStock => write!(f, "Stock quantity cannot be negative"),
            Self::InsufficientStock { product_id, available, requested } => {
                write!(f, "Insufficient stock for product {product_id}: {available} available, {requested} requested")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn details(stock: i32) -> ProductDetails {
        ProductDetails::new("Truffle Fries", Money::new(Decimal::new(5000, 2)).unwrap(), stock, None, Some("  ".into())).unwrap()
    }

    #[test]
    fn test_details_defaults() {
        let d = details(3);
        assert_eq!(d.category, DEFAULT_CATEGORY);
        assert_eq!(d.description, None);
        assert_eq!(ProductDetails::new(" ", Money::ZERO, 1, None, None), Err(ProductError::MissingName));
        assert_eq!(ProductDetails::new("x", Money::ZERO, -1, None, None), Err(ProductError::NegativeStock));
    }

    #[test]
    fn test_details_fit_the_columns() {
        let top = Money::new(Decimal::new(MAX_PRICE_CENTS, 2)).unwrap();
        assert!(ProductDetails::new("Lechon", top, 1, None, None).is_ok());
        let over = Money::new(Decimal::from(100_000_000)).unwrap();
        assert_eq!(ProductDetails::new("Lechon", over, 1, None, None), Err(ProductError::PriceTooHigh(over)));

        let long_name = "x".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(ProductDetails::new(long_name, Money::ZERO, 1, None, None), Err(ProductError::TooLong { field: "name", max: MAX_NAME_CHARS }));
        let long_category = Some("y".repeat(MAX_CATEGORY_CHARS + 1));
        assert_eq!(ProductDetails::new("Lechon", Money::ZERO, 1, long_category, None), Err(ProductError::TooLong { field: "category", max: MAX_CATEGORY_CHARS }));
        // limits count characters, not bytes
        assert!(ProductDetails::new("ñ".repeat(MAX_NAME_CHARS), Money::ZERO, 1, None, None).is_ok());
    }

    #[test]
    fn test_update_keeps_image_without_upload() {
        let mut p = Product::create(1, 7, details(3), Some("http://host/uploads/a.png".into()));
        p.apply(details(9), None);
        assert_eq!(p.stock_quantity, 9);
        assert_eq!(p.image_url.as_deref(), Some("http://host/uploads/a.png"));
        p.apply(details(9), Some("http://host/uploads/b.png".into()));
        assert_eq!(p.image_url.as_deref(), Some("http://host/uploads/b.png"));
    }

    #[test]
    fn test_remove_stock() {
        let mut p = Product::create(1, 7, details(3), None);
        p.remove_stock(Quantity::new(2).unwrap()).unwrap();
        assert_eq!(p.stock_quantity, 1);
        assert!(matches!(p.remove_stock(Quantity::new(2).unwrap()), Err(ProductError::InsufficientStock { .. })));
        assert_eq!(p.stock_quantity, 1);
    }
}
