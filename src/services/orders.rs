//! Order placement and fulfillment.

use tracing::{info, instrument};

use crate::domain::aggregates::{Cart, CustomerOrderSummary, Order, OrderId, OrderLine, OrderStatus, Transition, UserId, VendorId, VendorOrderSummary};
use crate::domain::events::DomainEvent;
use crate::publisher::EventPublisher;
use crate::store::MarketStore;
use crate::{MarketError, Result};

/// Places an order in `Pending`, priced from the catalog at this moment.
#[instrument(skip(store, publisher, cart), fields(customer_id = cart.customer_id(), vendor_id = cart.vendor_id(), lines = cart.lines().len()))]
pub async fn place_order(store: &dyn MarketStore, publisher: &EventPublisher, cart: Cart) -> Result<Order> {
    let order = store.place_order(&cart).await?;
    info!(order_id = order.order_id, total = %order.total_amount, "order placed");
    publisher.publish(DomainEvent::OrderPlaced {
        order_id: order.order_id, customer_id: order.customer_id, vendor_id: order.vendor_id, total: order.total_amount,
    }).await;
    Ok(order)
}

/// Moves an order to `next` and returns the resulting status.
#[instrument(skip(store, publisher))]
pub async fn change_status(store: &dyn MarketStore, publisher: &EventPublisher, order_id: OrderId, next: OrderStatus) -> Result<OrderStatus> {
    match store.transition_order(order_id, next).await? {
        Transition::Unchanged(status) => {
            info!(%status, "status unchanged");
            Ok(status)
        }
        Transition::Moved { from, to } => {
            info!(%from, %to, stock_taken = (to == OrderStatus::Completed), "order status changed");
            publisher.publish(DomainEvent::OrderStatusChanged { order_id, from, to }).await;
            Ok(to)
        }
    }
}

pub async fn get_order(store: &dyn MarketStore, order_id: OrderId) -> Result<Order> {
    store.find_order(order_id).await?
        .ok_or_else(|| MarketError::NotFound(format!("Order {order_id} not found")))
}

pub async fn vendor_orders(store: &dyn MarketStore, vendor_id: VendorId) -> Result<Vec<VendorOrderSummary>> {
    store.list_vendor_orders(vendor_id).await
}

pub async fn customer_orders(store: &dyn MarketStore, customer_id: UserId) -> Result<Vec<CustomerOrderSummary>> {
    store.list_customer_orders(customer_id).await
}

pub async fn order_items(store: &dyn MarketStore, order_id: OrderId) -> Result<Vec<OrderLine>> {
    store.list_order_items(order_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CartLine, ProductId};
    use crate::domain::value_objects::{Money, Quantity};
    use crate::services::fixtures::{self, details, money, seed};
    use rust_decimal::Decimal;

    fn cart(customer: UserId, vendor: VendorId, lines: &[(ProductId, i64)]) -> Cart {
        let lines = lines.iter().map(|&(product_id, qty)| CartLine { product_id, quantity: Quantity::new(qty).unwrap() }).collect();
        Cart::new(customer, vendor, "Room 305", None, lines).unwrap()
    }

    async fn stock(s: &fixtures::Seed, product_id: ProductId) -> i32 {
        s.store.find_product(product_id).await.unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_total_from_catalog_prices() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let order = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 2), (s.platter, 1)])).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount.amount(), Decimal::new(22000, 2));

        let items = order_items(&s.store, order.order_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price_at_order, money(5000));
        assert_eq!(items[1].price_at_order, money(12000));
        let sum: Money = items.iter().map(|i| i.price_at_order.multiply(Quantity::new(i64::from(i.quantity)).unwrap())).sum();
        assert_eq!(sum, order.total_amount);
        // placing an order reserves nothing
        assert_eq!(stock(&s, s.fries).await, 10);
    }

    #[tokio::test]
    async fn test_snapshot_survives_price_edit() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let order = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 3)])).await.unwrap();
        s.store.update_product(s.fries, details("Truffle Fries", 9900, 10), None).await.unwrap();

        let items = order_items(&s.store, order.order_id).await.unwrap();
        assert_eq!(items[0].price_at_order, money(5000));
        assert_eq!(get_order(&s.store, order.order_id).await.unwrap().total_amount, money(15000));
    }

    #[tokio::test]
    async fn test_unknown_product_writes_nothing() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let result = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 1), (9_999, 1)])).await;
        assert!(matches!(result, Err(MarketError::Validation(_))));
        assert_eq!(s.store.row_counts().await, (0, 0));
    }

    #[tokio::test]
    async fn test_unknown_customer_or_vendor_rejected() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let bad_customer = place_order(&s.store, &publisher, cart(4_242, s.vendor, &[(s.fries, 1)])).await;
        assert!(matches!(bad_customer, Err(MarketError::Validation(_))));
        let bad_vendor = place_order(&s.store, &publisher, cart(s.buyer, 4_242, &[(s.fries, 1)])).await;
        assert!(matches!(bad_vendor, Err(MarketError::Validation(_))));
        assert_eq!(s.store.row_counts().await, (0, 0));
    }

    #[tokio::test]
    async fn test_completion_takes_stock_once() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let order = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 2), (s.platter, 1), (s.fries, 1)])).await.unwrap();

        assert_eq!(change_status(&s.store, &publisher, order.order_id, OrderStatus::Ready).await.unwrap(), OrderStatus::Ready);
        assert_eq!(stock(&s, s.fries).await, 10);

        assert_eq!(change_status(&s.store, &publisher, order.order_id, OrderStatus::Completed).await.unwrap(), OrderStatus::Completed);
        assert_eq!(stock(&s, s.fries).await, 7);
        assert_eq!(stock(&s, s.platter).await, 4);

        assert_eq!(change_status(&s.store, &publisher, order.order_id, OrderStatus::Completed).await.unwrap(), OrderStatus::Completed);
        assert_eq!(stock(&s, s.fries).await, 7);
        assert_eq!(stock(&s, s.platter).await, 4);
    }

    #[tokio::test]
    async fn test_pending_can_complete_directly() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let order = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.platter, 5)])).await.unwrap();
        change_status(&s.store, &publisher, order.order_id, OrderStatus::Completed).await.unwrap();
        assert_eq!(stock(&s, s.platter).await, 0);
    }

    #[tokio::test]
    async fn test_terminal_orders_do_not_move() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let cancelled = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 1)])).await.unwrap();
        change_status(&s.store, &publisher, cancelled.order_id, OrderStatus::Cancelled).await.unwrap();
        for next in [OrderStatus::Pending, OrderStatus::Ready, OrderStatus::Completed] {
            let result = change_status(&s.store, &publisher, cancelled.order_id, next).await;
            assert!(matches!(result, Err(MarketError::InvalidState(_))));
        }
        assert_eq!(get_order(&s.store, cancelled.order_id).await.unwrap().status, OrderStatus::Cancelled);
        assert_eq!(stock(&s, s.fries).await, 10);

        let completed = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 1)])).await.unwrap();
        change_status(&s.store, &publisher, completed.order_id, OrderStatus::Completed).await.unwrap();
        let result = change_status(&s.store, &publisher, completed.order_id, OrderStatus::Cancelled).await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
        assert_eq!(get_order(&s.store, completed.order_id).await.unwrap().status, OrderStatus::Completed);
        assert_eq!(stock(&s, s.fries).await, 9);
    }

    #[tokio::test]
    async fn test_shortfall_blocks_completion() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let order = place_order(&s.store, &publisher, cart(s.buyer, s.vendor, &[(s.fries, 1), (s.platter, 6)])).await.unwrap();
        let result = change_status(&s.store, &publisher, order.order_id, OrderStatus::Completed).await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
        assert_eq!(stock(&s, s.fries).await, 10);
        assert_eq!(stock(&s, s.platter).await, 5);
        assert_eq!(get_order(&s.store, order.order_id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        assert!(matches!(change_status(&s.store, &publisher, 77, OrderStatus::Ready).await, Err(MarketError::NotFound(_))));
        assert!(matches!(order_items(&s.store, 77).await, Err(MarketError::NotFound(_))));
        assert!(matches!(get_order(&s.store, 77).await, Err(MarketError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_listings_newest_first() {
        let s = seed().await;
        let publisher = EventPublisher::disabled();
        let other_buyer = fixtures::add_buyer(&s.store, "21-0002", "Ben Reyes").await;
        let mut placed = Vec::new();
        for (buyer, qty) in [(s.buyer, 1), (other_buyer, 2), (s.buyer, 3)] {
            placed.push(place_order(&s.store, &publisher, cart(buyer, s.vendor, &[(s.fries, qty)])).await.unwrap().order_id);
        }

        let vendor_view = vendor_orders(&s.store, s.vendor).await.unwrap();
        assert_eq!(vendor_view.iter().map(|o| o.order.order_id).collect::<Vec<_>>(), vec![placed[2], placed[1], placed[0]]);
        assert_eq!(vendor_view[1].customer.full_name, "Ben Reyes");
        assert_eq!(vendor_view[0].items[0].product_name, "Truffle Fries");
        assert_eq!(vendor_view[0].items[0].quantity, 3);

        let customer_view = customer_orders(&s.store, s.buyer).await.unwrap();
        assert_eq!(customer_view.iter().map(|o| o.order.order_id).collect::<Vec<_>>(), vec![placed[2], placed[0]]);
        assert!(customer_view.iter().all(|o| o.shop_name == "Truffle Kings"));
    }
}
