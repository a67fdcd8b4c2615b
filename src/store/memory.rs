//! In-process store.
//!
//! Holds every table behind one async mutex, so each trait method is atomic
//! with respect to the others. Used by the test suite and when the service
//! starts without `DATABASE_URL`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::domain::aggregates::{
    Cart, CatalogEntry, CustomerOrderSummary, NewUser, NewVendor, Order, OrderId, OrderItem, OrderLine,
    OrderStatus, Product, ProductDetails, ProductError, ProductId, Transition, User, UserId, Vendor, VendorId,
    VendorListing, VendorOrderSummary, VerificationStatus,
};
use crate::domain::aggregates::order::{CustomerRef, OrderItemId};
use crate::domain::value_objects::{Money, Quantity};
use crate::store::MarketStore;
use crate::{MarketError, Result};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    vendors: BTreeMap<VendorId, Vendor>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    sequence: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn vendor_mut(&mut self, vendor_id: VendorId) -> Result<&mut Vendor> {
        self.vendors.get_mut(&vendor_id).ok_or_else(|| MarketError::NotFound(format!("Vendor {vendor_id} not found")))
    }

    fn lines_of(&self, order_id: OrderId) -> Vec<OrderLine> {
        self.order_items.values()
            .filter(|item| item.order_id == order_id)
            .filter_map(|item| {
                let product = self.products.get(&item.product_id)?;
                Some(OrderLine {
                    order_item_id: item.order_item_id, product_id: item.product_id, product_name: product.name.clone(),
                    image_url: product.image_url.clone(), quantity: item.quantity, price_at_order: item.price_at_order,
                })
            })
            .collect()
    }

    fn orders_where(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().filter(|o| keep(o)).cloned().collect();
        orders.sort_by(Order::newest_first);
        orders
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn find_user_by_student_number(&self, student_number: &str) -> Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.student_number == student_number).cloned())
    }

    async fn create_user(&self, user: NewUser, vendor: Option<NewVendor>) -> Result<User> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.student_number == user.student_number) {
            return Err(MarketError::Conflict(format!("{} is already registered", user.student_number)));
        }
        let user_id = t.next_id();
        let created = User {
            user_id, student_number: user.student_number, full_name: user.full_name, password_hash: user.password_hash,
            role: user.role, id_card_image: user.id_card_image, created_at: Utc::now(),
        };
        t.users.insert(user_id, created.clone());
        if let Some(v) = vendor {
            let vendor_id = t.next_id();
            t.vendors.insert(vendor_id, Vendor {
                vendor_id, user_id, shop_name: v.shop_name, course_section: Some(v.course_section), is_open: false,
                verification_status: VerificationStatus::Pending, gcash_number: None, shop_description: None,
            });
        }
        Ok(created)
    }

    async fn find_vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>> {
        let t = self.tables.lock().await;
        Ok(t.vendors.values().find(|v| v.user_id == user_id).cloned())
    }

    async fn list_vendors(&self) -> Result<Vec<VendorListing>> {
        let t = self.tables.lock().await;
        Ok(t.vendors.values()
            .map(|v| VendorListing {
                vendor: v.clone(),
                owner_name: t.users.get(&v.user_id).map(|u| u.full_name.clone()).unwrap_or_default(),
            })
            .collect())
    }

    async fn set_vendor_verification(&self, vendor_id: VendorId, status: VerificationStatus) -> Result<Vendor> {
        let mut t = self.tables.lock().await;
        let vendor = t.vendor_mut(vendor_id)?;
        vendor.verification_status = status;
        Ok(vendor.clone())
    }

    async fn set_vendor_open(&self, vendor_id: VendorId, is_open: bool) -> Result<Vendor> {
        let mut t = self.tables.lock().await;
        let vendor = t.vendor_mut(vendor_id)?;
        vendor.is_open = is_open;
        Ok(vendor.clone())
    }

    async fn delete_vendor(&self, vendor_id: VendorId) -> Result<()> {
        let mut t = self.tables.lock().await;
        if !t.vendors.contains_key(&vendor_id) {
            return Err(MarketError::NotFound(format!("Vendor {vendor_id} not found")));
        }
        let Tables { products, orders, order_items, vendors, .. } = &mut *t;
        order_items.retain(|_, item| {
            let product_of_vendor = products.get(&item.product_id).is_some_and(|p| p.vendor_id == vendor_id);
            let order_of_vendor = orders.get(&item.order_id).is_some_and(|o| o.vendor_id == vendor_id);
            !(product_of_vendor || order_of_vendor)
        });
        products.retain(|_, p| p.vendor_id != vendor_id);
        orders.retain(|_, o| o.vendor_id != vendor_id);
        vendors.remove(&vendor_id);
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<CatalogEntry>> {
        let t = self.tables.lock().await;
        Ok(t.products.values()
            .filter_map(|p| {
                let vendor = t.vendors.get(&p.vendor_id)?;
                Some(CatalogEntry { product: p.clone(), shop_name: vendor.shop_name.clone() })
            })
            .collect())
    }

    async fn list_vendor_products(&self, vendor_id: VendorId) -> Result<Vec<Product>> {
        let t = self.tables.lock().await;
        Ok(t.products.values().rev().filter(|p| p.vendor_id == vendor_id).cloned().collect())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&product_id).cloned())
    }

    async fn create_product(&self, vendor_id: VendorId, details: ProductDetails, image_url: Option<String>) -> Result<Product> {
        let mut t = self.tables.lock().await;
        if !t.vendors.contains_key(&vendor_id) {
            return Err(MarketError::Validation(format!("Vendor ID {vendor_id} does not exist")));
        }
        let product_id = t.next_id();
        let product = Product::create(product_id, vendor_id, details, image_url);
        t.products.insert(product_id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product_id: ProductId, details: ProductDetails, image_url: Option<String>) -> Result<Product> {
        let mut t = self.tables.lock().await;
        let product = t.products.get_mut(&product_id)
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} not found")))?;
        product.apply(details, image_url);
        Ok(product.clone())
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<Product> {
        let mut t = self.tables.lock().await;
        let product = t.products.remove(&product_id)
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} not found")))?;
        t.order_items.retain(|_, item| item.product_id != product_id);
        Ok(product)
    }

    async fn place_order(&self, cart: &Cart) -> Result<Order> {
        let mut t = self.tables.lock().await;
        if !t.users.contains_key(&cart.customer_id()) {
            return Err(MarketError::Validation(format!("Customer {} does not exist", cart.customer_id())));
        }
        if !t.vendors.contains_key(&cart.vendor_id()) {
            return Err(MarketError::Validation(format!("Vendor ID {} does not exist", cart.vendor_id())));
        }
        let prices: HashMap<ProductId, Money> = cart.product_ids().into_iter()
            .filter_map(|id| t.products.get(&id).map(|p| (id, p.price)))
            .collect();
        let priced = cart.price(&prices)?;

        let order_id = t.next_id();
        let order = Order {
            order_id, customer_id: priced.customer_id, vendor_id: priced.vendor_id, total_amount: priced.total,
            status: OrderStatus::Pending, delivery_location: priced.delivery_location, payment_method: priced.payment_method,
            created_at: Utc::now(),
        };
        t.orders.insert(order_id, order.clone());
        for line in priced.lines {
            let order_item_id = t.next_id();
            t.order_items.insert(order_item_id, OrderItem {
                order_item_id, order_id, product_id: line.product_id, quantity: line.quantity.as_i32(), price_at_order: line.price_at_order,
            });
        }
        Ok(order)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&order_id).cloned())
    }

    async fn transition_order(&self, order_id: OrderId, next: OrderStatus) -> Result<Transition> {
        let mut t = self.tables.lock().await;
        let current = t.orders.get(&order_id)
            .ok_or_else(|| MarketError::NotFound(format!("Order {order_id} not found")))?
            .status;
        let transition = current.transition_to(next)?;
        if let Transition::Unchanged(_) = transition { return Ok(transition); }

        if transition.completes() {
            let mut wanted: BTreeMap<ProductId, i64> = BTreeMap::new();
            for item in t.order_items.values().filter(|i| i.order_id == order_id) {
                *wanted.entry(item.product_id).or_default() += i64::from(item.quantity);
            }
            // Check every product before touching any, so a shortfall leaves stock as it was.
            let mut takes = Vec::with_capacity(wanted.len());
            for (product_id, qty) in wanted {
                let Some(product) = t.products.get(&product_id) else { continue };
                if i64::from(product.stock_quantity) < qty {
                    return Err(ProductError::InsufficientStock {
                        product_id, available: product.stock_quantity, requested: u32::try_from(qty).unwrap_or(u32::MAX),
                    }.into());
                }
                takes.push((product_id, Quantity::new(qty)?));
            }
            for (product_id, qty) in takes {
                if let Some(product) = t.products.get_mut(&product_id) { product.remove_stock(qty)?; }
            }
        }
        if let Some(order) = t.orders.get_mut(&order_id) { order.status = next; }
        Ok(transition)
    }

    async fn list_vendor_orders(&self, vendor_id: VendorId) -> Result<Vec<VendorOrderSummary>> {
        let t = self.tables.lock().await;
        Ok(t.orders_where(|o| o.vendor_id == vendor_id).into_iter()
            .map(|order| VendorOrderSummary {
                customer: CustomerRef { full_name: t.users.get(&order.customer_id).map(|u| u.full_name.clone()).unwrap_or_default() },
                items: t.lines_of(order.order_id),
                order,
            })
            .collect())
    }

    async fn list_customer_orders(&self, customer_id: UserId) -> Result<Vec<CustomerOrderSummary>> {
        let t = self.tables.lock().await;
        Ok(t.orders_where(|o| o.customer_id == customer_id).into_iter()
            .map(|order| CustomerOrderSummary {
                shop_name: t.vendors.get(&order.vendor_id).map(|v| v.shop_name.clone()).unwrap_or_default(),
                items: t.lines_of(order.order_id),
                order,
            })
            .collect())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let t = self.tables.lock().await;
        if !t.orders.contains_key(&order_id) {
            return Err(MarketError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(t.lines_of(order_id))
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Number of (orders, order items) rows, for all-or-nothing assertions.
    pub(crate) async fn row_counts(&self) -> (usize, usize) {
        let t = self.tables.lock().await;
        (t.orders.len(), t.order_items.len())
    }
}
