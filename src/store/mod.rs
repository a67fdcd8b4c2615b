//! Storage client for the marketplace.
//!
//! Handlers and services receive a `&dyn MarketStore` rather than reaching for
//! a global pool. Every method is one unit of work: implementations must make
//! multi-row writes (checkout, completion, cascades, registration) all-or-nothing.

use async_trait::async_trait;

use crate::domain::aggregates::{
    Cart, CatalogEntry, CustomerOrderSummary, NewUser, NewVendor, Order, OrderId, OrderLine, OrderStatus,
    Product, ProductDetails, ProductId, Transition, User, UserId, Vendor, VendorId, VendorListing,
    VendorOrderSummary, VerificationStatus,
};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    // ---- identity ----

    async fn find_user_by_student_number(&self, student_number: &str) -> Result<Option<User>>;

    /// Inserts the user and, for vendors, the vendor profile. A taken student
    /// number is a `Conflict`.
    async fn create_user(&self, user: NewUser, vendor: Option<NewVendor>) -> Result<User>;

    async fn find_vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>>;

    async fn list_vendors(&self) -> Result<Vec<VendorListing>>;

    async fn set_vendor_verification(&self, vendor_id: VendorId, status: VerificationStatus) -> Result<Vendor>;

    async fn set_vendor_open(&self, vendor_id: VendorId, is_open: bool) -> Result<Vendor>;

    /// Removes the vendor with its products, its orders and every line item
    /// touching either.
    async fn delete_vendor(&self, vendor_id: VendorId) -> Result<()>;

    // ---- catalog ----

    async fn list_products(&self) -> Result<Vec<CatalogEntry>>;

    /// Products of one shop, newest id first.
    async fn list_vendor_products(&self, vendor_id: VendorId) -> Result<Vec<Product>>;

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Fails with `Validation` when the vendor does not exist.
    async fn create_product(&self, vendor_id: VendorId, details: ProductDetails, image_url: Option<String>) -> Result<Product>;

    /// Replaces the editable fields; keeps the current image when `image_url` is `None`.
    async fn update_product(&self, product_id: ProductId, details: ProductDetails, image_url: Option<String>) -> Result<Product>;

    /// Removes the product and the order lines referencing it.
    async fn delete_product(&self, product_id: ProductId) -> Result<Product>;

    // ---- orders ----

    /// Prices the cart from current catalog prices and persists the order and
    /// its lines together. Nothing is written when any product is unknown.
    async fn place_order(&self, cart: &Cart) -> Result<Order>;

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Applies a status change under the order's lock. Moving into
    /// `Completed` takes each line's quantity out of stock in the same unit;
    /// if any product lacks stock nothing changes.
    async fn transition_order(&self, order_id: OrderId, next: OrderStatus) -> Result<Transition>;

    async fn list_vendor_orders(&self, vendor_id: VendorId) -> Result<Vec<VendorOrderSummary>>;

    async fn list_customer_orders(&self, customer_id: UserId) -> Result<Vec<CustomerOrderSummary>>;

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;
}
