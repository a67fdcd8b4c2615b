//! Seed data shared by service and HTTP tests.

use rust_decimal::Decimal;

use crate::domain::aggregates::{NewUser, NewVendor, ProductDetails, ProductId, Role, UserId, VendorId};
use crate::domain::value_objects::Money;
use crate::store::{MarketStore, MemoryStore};
use crate::uploads::ImageStore;

pub(crate) struct Seed {
    pub store: MemoryStore,
    pub buyer: UserId,
    pub vendor: VendorId,
    /// 50.00, stock 10
    pub fries: ProductId,
    /// 120.00, stock 5
    pub platter: ProductId,
}

pub(crate) fn money(cents: i64) -> Money {
    Money::new(Decimal::new(cents, 2)).unwrap()
}

pub(crate) fn details(name: &str, cents: i64, stock: i32) -> ProductDetails {
    ProductDetails::new(name, money(cents), stock, None, None).unwrap()
}

pub(crate) async fn add_vendor(store: &MemoryStore, shop_name: &str) -> VendorId {
    let user = store.create_user(
        NewUser { student_number: shop_name.into(), full_name: shop_name.into(), password_hash: "-".into(), role: Role::Vendor, id_card_image: None },
        Some(NewVendor { shop_name: shop_name.into(), course_section: "BSIT 2A".into() }),
    ).await.unwrap();
    store.find_vendor_by_user(user.user_id).await.unwrap().unwrap().vendor_id
}

pub(crate) async fn add_buyer(store: &MemoryStore, student_number: &str, full_name: &str) -> UserId {
    store.create_user(
        NewUser { student_number: student_number.into(), full_name: full_name.into(), password_hash: "-".into(), role: Role::Buyer, id_card_image: None },
        None,
    ).await.unwrap().user_id
}

pub(crate) async fn seed() -> Seed {
    let store = MemoryStore::new();
    let buyer = add_buyer(&store, "21-0001", "Ana Cruz").await;
    let vendor = add_vendor(&store, "Truffle Kings").await;
    let fries = store.create_product(vendor, details("Truffle Fries", 5000, 10), None).await.unwrap().product_id;
    let platter = store.create_product(vendor, details("Party Platter", 12000, 5), None).await.unwrap().product_id;
    Seed { store, buyer, vendor, fries, platter }
}

/// An image store in a fresh temp directory.
pub(crate) async fn images() -> ImageStore {
    let dir = std::env::temp_dir().join(format!("campus-market-test-{}", uuid::Uuid::new_v4()));
    ImageStore::open(dir, "http://localhost:3000").await.unwrap()
}
