//! Postgres store over a sqlx pool.
//!
//! Multi-statement operations run inside one transaction; a dropped
//! transaction rolls back, so every early `?` return leaves no partial writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;

use crate::domain::aggregates::order::{CustomerRef, OrderItemId};
use crate::domain::aggregates::{
    Cart, CatalogEntry, CustomerOrderSummary, NewUser, NewVendor, Order, OrderId, OrderLine, OrderStatus, Product,
    ProductDetails, ProductError, ProductId, Transition, User, UserId, Vendor, VendorId, VendorListing,
    VendorOrderSummary, VerificationStatus,
};
use crate::domain::value_objects::Money;
use crate::store::MarketStore;
use crate::{MarketError, Result};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow { user_id: i64, student_number: String, full_name: String, password_hash: String, role: String, id_card_image: Option<String>, created_at: DateTime<Utc> }

impl TryFrom<UserRow> for User {
    type Error = MarketError;
    fn try_from(r: UserRow) -> Result<Self> {
        Ok(User {
            user_id: r.user_id, student_number: r.student_number, full_name: r.full_name, password_hash: r.password_hash,
            role: r.role.parse().map_err(corrupt)?, id_card_image: r.id_card_image, created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VendorRow { vendor_id: i64, user_id: i64, shop_name: String, course_section: Option<String>, is_open: bool, verification_status: String, gcash_number: Option<String>, shop_description: Option<String> }

impl TryFrom<VendorRow> for Vendor {
    type Error = MarketError;
    fn try_from(r: VendorRow) -> Result<Self> {
        Ok(Vendor {
            vendor_id: r.vendor_id, user_id: r.user_id, shop_name: r.shop_name, course_section: r.course_section, is_open: r.is_open,
            verification_status: r.verification_status.parse().map_err(corrupt)?, gcash_number: r.gcash_number, shop_description: r.shop_description,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow { product_id: i64, vendor_id: i64, name: String, price: Decimal, stock_quantity: i32, category: String, description: Option<String>, image_url: Option<String> }

impl TryFrom<ProductRow> for Product {
    type Error = MarketError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            product_id: r.product_id, vendor_id: r.vendor_id, name: r.name, price: Money::new(r.price).map_err(corrupt)?,
            stock_quantity: r.stock_quantity, category: r.category, description: r.description, image_url: r.image_url,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow { order_id: i64, customer_id: i64, vendor_id: i64, total_amount: Decimal, status: String, delivery_location: String, payment_method: String, created_at: DateTime<Utc> }

impl TryFrom<OrderRow> for Order {
    type Error = MarketError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            order_id: r.order_id, customer_id: r.customer_id, vendor_id: r.vendor_id, total_amount: Money::new(r.total_amount).map_err(corrupt)?,
            status: r.status.parse().map_err(corrupt)?, delivery_location: r.delivery_location, payment_method: r.payment_method, created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow { order_item_id: OrderItemId, order_id: i64, product_id: i64, product_name: String, image_url: Option<String>, quantity: i32, price_at_order: Decimal }

fn corrupt(e: impl std::fmt::Display) -> MarketError {
    MarketError::Internal(format!("unreadable stored value: {e}"))
}

fn vendor_not_found(vendor_id: VendorId) -> MarketError {
    MarketError::NotFound(format!("Vendor {vendor_id} not found"))
}

fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> MarketError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => MarketError::Conflict(message()),
        _ => MarketError::Storage(e),
    }
}

const USER_COLUMNS: &str = "user_id, student_number, full_name, password_hash, role, id_card_image, created_at";
const VENDOR_COLUMNS: &str = "vendor_id, user_id, shop_name, course_section, is_open, verification_status, gcash_number, shop_description";
const PRODUCT_COLUMNS: &str = "product_id, vendor_id, name, price, stock_quantity, category, description, image_url";
const ORDER_COLUMNS: &str = "order_id, customer_id, vendor_id, total_amount, status, delivery_location, payment_method, created_at";

impl PgStore {
    /// Line items of the given orders, grouped by order id.
    async fn lines_for(&self, order_ids: &[OrderId]) -> Result<HashMap<OrderId, Vec<OrderLine>>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT oi.order_item_id, oi.order_id, oi.product_id, p.name AS product_name, p.image_url, oi.quantity, oi.price_at_order \
             FROM order_items oi JOIN products p ON p.product_id = oi.product_id \
             WHERE oi.order_id = ANY($1) ORDER BY oi.order_item_id")
            .bind(order_ids).fetch_all(&self.pool).await?;
        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for r in rows {
            grouped.entry(r.order_id).or_default().push(OrderLine {
                order_item_id: r.order_item_id, product_id: r.product_id, product_name: r.product_name, image_url: r.image_url,
                quantity: r.quantity, price_at_order: Money::new(r.price_at_order).map_err(corrupt)?,
            });
        }
        Ok(grouped)
    }

    /// Takes each product's ordered quantity out of stock. A product without
    /// enough stock aborts the whole transaction.
    async fn take_stock(tx: &mut Transaction<'_, Postgres>, order_id: OrderId) -> Result<()> {
        let wanted: Vec<(ProductId, i64)> = sqlx::query_as(
            "SELECT product_id, SUM(quantity)::BIGINT FROM order_items WHERE order_id = $1 GROUP BY product_id ORDER BY product_id")
            .bind(order_id).fetch_all(&mut **tx).await?;
        for (product_id, qty) in wanted {
            let updated = sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $2 WHERE product_id = $1 AND stock_quantity >= $2")
                .bind(product_id).bind(qty).execute(&mut **tx).await?;
            if updated.rows_affected() == 0 {
                let available: i32 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE product_id = $1")
                    .bind(product_id).fetch_optional(&mut **tx).await?.unwrap_or(0);
                return Err(ProductError::InsufficientStock { product_id, available, requested: u32::try_from(qty).unwrap_or(u32::MAX) }.into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn find_user_by_student_number(&self, student_number: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE student_number = $1"))
            .bind(student_number).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn create_user(&self, user: NewUser, vendor: Option<NewVendor>) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let student_number = user.student_number.clone();
        let created: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (student_number, full_name, password_hash, role, id_card_image) VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"))
            .bind(&user.student_number).bind(&user.full_name).bind(&user.password_hash).bind(user.role.as_str()).bind(&user.id_card_image)
            .fetch_one(&mut *tx).await
            .map_err(|e| conflict_on_unique(e, || format!("{student_number} is already registered")))?;
        if let Some(v) = vendor {
            sqlx::query("INSERT INTO vendors (user_id, shop_name, course_section, is_open, verification_status) VALUES ($1, $2, $3, FALSE, $4)")
                .bind(created.user_id).bind(&v.shop_name).bind(&v.course_section).bind(VerificationStatus::Pending.as_str())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        created.try_into()
    }

    async fn find_vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>> {
        sqlx::query_as::<_, VendorRow>(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE user_id = $1"))
            .bind(user_id).fetch_optional(&self.pool).await?
            .map(Vendor::try_from).transpose()
    }

    async fn list_vendors(&self) -> Result<Vec<VendorListing>> {
        #[derive(sqlx::FromRow)]
        struct Row { #[sqlx(flatten)] vendor: VendorRow, owner_name: String }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT v.vendor_id, v.user_id, v.shop_name, v.course_section, v.is_open, v.verification_status, v.gcash_number, v.shop_description, \
             u.full_name AS owner_name FROM vendors v JOIN users u ON u.user_id = v.user_id ORDER BY v.vendor_id")
            .fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| Ok(VendorListing { vendor: r.vendor.try_into()?, owner_name: r.owner_name }))
            .collect()
    }

    async fn set_vendor_verification(&self, vendor_id: VendorId, status: VerificationStatus) -> Result<Vendor> {
        sqlx::query_as::<_, VendorRow>(&format!("UPDATE vendors SET verification_status = $2 WHERE vendor_id = $1 RETURNING {VENDOR_COLUMNS}"))
            .bind(vendor_id).bind(status.as_str()).fetch_optional(&self.pool).await?
            .ok_or_else(|| vendor_not_found(vendor_id))?
            .try_into()
    }

    async fn set_vendor_open(&self, vendor_id: VendorId, is_open: bool) -> Result<Vendor> {
        sqlx::query_as::<_, VendorRow>(&format!("UPDATE vendors SET is_open = $2 WHERE vendor_id = $1 RETURNING {VENDOR_COLUMNS}"))
            .bind(vendor_id).bind(is_open).fetch_optional(&self.pool).await?
            .ok_or_else(|| vendor_not_found(vendor_id))?
            .try_into()
    }

    async fn delete_vendor(&self, vendor_id: VendorId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT vendor_id FROM vendors WHERE vendor_id = $1 FOR UPDATE")
            .bind(vendor_id).fetch_optional(&mut *tx).await?;
        if exists.is_none() {
            return Err(vendor_not_found(vendor_id));
        }
        sqlx::query(
            "DELETE FROM order_items WHERE product_id IN (SELECT product_id FROM products WHERE vendor_id = $1) \
             OR order_id IN (SELECT order_id FROM orders WHERE vendor_id = $1)")
            .bind(vendor_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products WHERE vendor_id = $1").bind(vendor_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM orders WHERE vendor_id = $1").bind(vendor_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM vendors WHERE vendor_id = $1").bind(vendor_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<CatalogEntry>> {
        #[derive(sqlx::FromRow)]
        struct Row { #[sqlx(flatten)] product: ProductRow, shop_name: String }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT p.product_id, p.vendor_id, p.name, p.price, p.stock_quantity, p.category, p.description, p.image_url, v.shop_name \
             FROM products p JOIN vendors v ON v.vendor_id = p.vendor_id ORDER BY p.product_id")
            .fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| Ok(CatalogEntry { product: r.product.try_into()?, shop_name: r.shop_name }))
            .collect()
    }

    async fn list_vendor_products(&self, vendor_id: VendorId) -> Result<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE vendor_id = $1 ORDER BY product_id DESC"))
            .bind(vendor_id).fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"))
            .bind(product_id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn create_product(&self, vendor_id: VendorId, details: ProductDetails, image_url: Option<String>) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let vendor: Option<i64> = sqlx::query_scalar("SELECT vendor_id FROM vendors WHERE vendor_id = $1")
            .bind(vendor_id).fetch_optional(&mut *tx).await?;
        if vendor.is_none() {
            return Err(MarketError::Validation(format!("Vendor ID {vendor_id} does not exist")));
        }
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (vendor_id, name, price, stock_quantity, category, description, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"))
            .bind(vendor_id).bind(&details.name).bind(details.price.amount()).bind(details.stock_quantity)
            .bind(&details.category).bind(&details.description).bind(&image_url)
            .fetch_one(&mut *tx).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn update_product(&self, product_id: ProductId, details: ProductDetails, image_url: Option<String>) -> Result<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $2, price = $3, stock_quantity = $4, category = $5, description = $6, \
             image_url = COALESCE($7, image_url) WHERE product_id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(product_id).bind(&details.name).bind(details.price.amount()).bind(details.stock_quantity)
            .bind(&details.category).bind(&details.description).bind(&image_url)
            .fetch_optional(&self.pool).await?
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} not found")))?
            .try_into()
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM order_items WHERE product_id = $1").bind(product_id).execute(&mut *tx).await?;
        let row: ProductRow = sqlx::query_as(&format!("DELETE FROM products WHERE product_id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(product_id).fetch_optional(&mut *tx).await?
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} not found")))?;
        tx.commit().await?;
        row.try_into()
    }

    async fn place_order(&self, cart: &Cart) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let customer: Option<i64> = sqlx::query_scalar("SELECT user_id FROM users WHERE user_id = $1")
            .bind(cart.customer_id()).fetch_optional(&mut *tx).await?;
        if customer.is_none() {
            return Err(MarketError::Validation(format!("Customer {} does not exist", cart.customer_id())));
        }
        let vendor: Option<i64> = sqlx::query_scalar("SELECT vendor_id FROM vendors WHERE vendor_id = $1")
            .bind(cart.vendor_id()).fetch_optional(&mut *tx).await?;
        if vendor.is_none() {
            return Err(MarketError::Validation(format!("Vendor ID {} does not exist", cart.vendor_id())));
        }

        // FOR SHARE keeps the prices from changing until the snapshot is written.
        let rows: Vec<(ProductId, Decimal)> = sqlx::query_as("SELECT product_id, price FROM products WHERE product_id = ANY($1) FOR SHARE")
            .bind(cart.product_ids()).fetch_all(&mut *tx).await?;
        let prices = rows.into_iter()
            .map(|(id, price)| Ok((id, Money::new(price).map_err(corrupt)?)))
            .collect::<Result<HashMap<ProductId, Money>>>()?;
        let priced = cart.price(&prices)?;

        let order: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (customer_id, vendor_id, delivery_location, payment_method, total_amount, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_COLUMNS}"))
            .bind(priced.customer_id).bind(priced.vendor_id).bind(&priced.delivery_location).bind(&priced.payment_method)
            .bind(priced.total.amount()).bind(OrderStatus::Pending.as_str())
            .fetch_one(&mut *tx).await?;
        for line in &priced.lines {
            sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price_at_order) VALUES ($1, $2, $3, $4)")
                .bind(order.order_id).bind(line.product_id).bind(line.quantity.as_i32()).bind(line.price_at_order.amount())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        order.try_into()
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
            .bind(order_id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn transition_order(&self, order_id: OrderId, next: OrderStatus) -> Result<Transition> {
        let mut tx = self.pool.begin().await?;
        let current: String = sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1 FOR UPDATE")
            .bind(order_id).fetch_optional(&mut *tx).await?
            .ok_or_else(|| MarketError::NotFound(format!("Order {order_id} not found")))?;
        let current: OrderStatus = current.parse().map_err(corrupt)?;
        let transition = current.transition_to(next)?;
        if let Transition::Unchanged(_) = transition {
            return Ok(transition);
        }
        if transition.completes() {
            Self::take_stock(&mut tx, order_id).await?;
        }
        sqlx::query("UPDATE orders SET status = $2 WHERE order_id = $1")
            .bind(order_id).bind(next.as_str()).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(transition)
    }

    async fn list_vendor_orders(&self, vendor_id: VendorId) -> Result<Vec<VendorOrderSummary>> {
        #[derive(sqlx::FromRow)]
        struct Row { #[sqlx(flatten)] order: OrderRow, customer_name: String }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT o.order_id, o.customer_id, o.vendor_id, o.total_amount, o.status, o.delivery_location, o.payment_method, o.created_at, \
             u.full_name AS customer_name FROM orders o JOIN users u ON u.user_id = o.customer_id \
             WHERE o.vendor_id = $1 ORDER BY o.created_at DESC, o.order_id DESC")
            .bind(vendor_id).fetch_all(&self.pool).await?;
        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.order_id).collect();
        let mut lines = self.lines_for(&ids).await?;
        rows.into_iter()
            .map(|r| {
                let order: Order = r.order.try_into()?;
                let items = lines.remove(&order.order_id).unwrap_or_default();
                Ok(VendorOrderSummary { order, customer: CustomerRef { full_name: r.customer_name }, items })
            })
            .collect()
    }

    async fn list_customer_orders(&self, customer_id: UserId) -> Result<Vec<CustomerOrderSummary>> {
        #[derive(sqlx::FromRow)]
        struct Row { #[sqlx(flatten)] order: OrderRow, shop_name: String }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT o.order_id, o.customer_id, o.vendor_id, o.total_amount, o.status, o.delivery_location, o.payment_method, o.created_at, \
             v.shop_name FROM orders o JOIN vendors v ON v.vendor_id = o.vendor_id \
             WHERE o.customer_id = $1 ORDER BY o.created_at DESC, o.order_id DESC")
            .bind(customer_id).fetch_all(&self.pool).await?;
        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.order_id).collect();
        let mut lines = self.lines_for(&ids).await?;
        rows.into_iter()
            .map(|r| {
                let order: Order = r.order.try_into()?;
                let items = lines.remove(&order.order_id).unwrap_or_default();
                Ok(CustomerOrderSummary { order, shop_name: r.shop_name, items })
            })
            .collect()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        if self.find_order(order_id).await?.is_none() {
            return Err(MarketError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(self.lines_for(&[order_id]).await?.remove(&order_id).unwrap_or_default())
    }
}
