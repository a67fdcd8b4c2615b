//! Vendor shops: open/closed toggle and admin verification.

use tracing::{info, instrument, warn};

use crate::domain::aggregates::{Vendor, VendorId, VendorListing, VerificationStatus};
use crate::domain::events::DomainEvent;
use crate::publisher::EventPublisher;
use crate::store::MarketStore;
use crate::uploads::ImageStore;
use crate::Result;

pub async fn list_vendors(store: &dyn MarketStore) -> Result<Vec<VendorListing>> {
    store.list_vendors().await
}

#[instrument(skip(store, publisher))]
pub async fn set_verification(store: &dyn MarketStore, publisher: &EventPublisher, vendor_id: VendorId, status: VerificationStatus) -> Result<Vendor> {
    let vendor = store.set_vendor_verification(vendor_id, status).await?;
    info!(shop = %vendor.shop_name, "vendor verification updated");
    publisher.publish(DomainEvent::VendorVerificationChanged { vendor_id, status }).await;
    Ok(vendor)
}

#[instrument(skip(store))]
pub async fn set_shop_open(store: &dyn MarketStore, vendor_id: VendorId, is_open: bool) -> Result<Vendor> {
    let vendor = store.set_vendor_open(vendor_id, is_open).await?;
    info!(shop = %vendor.shop_name, "shop {}", if is_open { "opened" } else { "closed" });
    Ok(vendor)
}

/// Removes a vendor with its products, its orders and every line touching
/// either. The owning user account is kept.
#[instrument(skip(store, images))]
pub async fn delete_vendor(store: &dyn MarketStore, images: &ImageStore, vendor_id: VendorId) -> Result<()> {
    let products = store.list_vendor_products(vendor_id).await?;
    store.delete_vendor(vendor_id).await?;
    for url in products.iter().filter_map(|p| p.image_url.as_deref()) {
        images.discard(url).await;
    }
    warn!(products = products.len(), "vendor deleted");
    Ok(())
}
