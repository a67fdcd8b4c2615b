//! Storefront catalog and vendor product management.

use tracing::{info, instrument, warn};

use crate::domain::aggregates::{CatalogEntry, Product, ProductDetails, ProductId, VendorId};
use crate::store::MarketStore;
use crate::uploads::{ImageStore, Upload};
use crate::{MarketError, Result};

/// All products with their shop names, in listing order.
pub async fn list_products(store: &dyn MarketStore) -> Result<Vec<CatalogEntry>> {
    store.list_products().await
}

pub async fn vendor_products(store: &dyn MarketStore, vendor_id: VendorId) -> Result<Vec<Product>> {
    store.list_vendor_products(vendor_id).await
}

pub async fn get_product(store: &dyn MarketStore, product_id: ProductId) -> Result<Product> {
    store.find_product(product_id).await?
        .ok_or_else(|| MarketError::NotFound(format!("Product {product_id} not found")))
}

#[instrument(skip(store, images, details, image), fields(name = %details.name))]
pub async fn create_product(store: &dyn MarketStore, images: &ImageStore, vendor_id: VendorId, details: ProductDetails, image: Option<Upload>) -> Result<Product> {
    let image_url = match &image {
        Some(upload) => Some(images.save(upload).await?),
        None => None,
    };
    match store.create_product(vendor_id, details, image_url.clone()).await {
        Ok(product) => {
            info!(product_id = product.product_id, "product created");
            Ok(product)
        }
        Err(e) => {
            if let Some(url) = image_url { images.discard(&url).await; }
            Err(e)
        }
    }
}

/// Edits a product. Without a new image the current one is kept; with one,
/// the old file is removed once the edit is stored.
#[instrument(skip(store, images, details, image))]
pub async fn update_product(store: &dyn MarketStore, images: &ImageStore, product_id: ProductId, details: ProductDetails, image: Option<Upload>) -> Result<Product> {
    let previous = get_product(store, product_id).await?;
    let image_url = match &image {
        Some(upload) => Some(images.save(upload).await?),
        None => None,
    };
    let updated = match store.update_product(product_id, details, image_url.clone()).await {
        Ok(product) => product,
        Err(e) => {
            if let Some(url) = image_url { images.discard(&url).await; }
            return Err(e);
        }
    };
    if let (Some(_), Some(old)) = (&image_url, &previous.image_url) {
        images.discard(old).await;
    }
    info!(price = %updated.price, stock = updated.stock_quantity, "product updated");
    Ok(updated)
}

/// Deletes a product along with every order line that referenced it.
#[instrument(skip(store, images))]
pub async fn delete_product(store: &dyn MarketStore, images: &ImageStore, product_id: ProductId) -> Result<()> {
    let removed = store.delete_product(product_id).await?;
    if let Some(url) = &removed.image_url {
        images.discard(url).await;
    }
    warn!(name = %removed.name, "product deleted with its order lines");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, CartLine, DEFAULT_CATEGORY};
    use crate::domain::value_objects::Quantity;
    use crate::services::fixtures::{add_vendor, details, images, money, seed};

    fn png(name: &str) -> Upload {
        Upload { file_name: name.to_string(), bytes: vec![0x89, 0x50, 0x4e, 0x47] }
    }

    fn file_of(images: &ImageStore, url: &str) -> std::path::PathBuf {
        images.dir().join(url.rsplit('/').next().unwrap())
    }

    #[tokio::test]
    async fn test_catalog_listing_carries_shop_names() {
        let s = seed().await;
        let other = add_vendor(&s.store, "Kape Kanto").await;
        let latte = s.store.create_product(other, details("Iced Latte", 9500, 20), None).await.unwrap();

        let catalog = list_products(&s.store).await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[2].product.product_id, latte.product_id);
        assert_eq!(catalog[2].shop_name, "Kape Kanto");
        assert!(catalog[..2].iter().all(|e| e.shop_name == "Truffle Kings"));

        let own = vendor_products(&s.store, s.vendor).await.unwrap();
        assert_eq!(own.iter().map(|p| p.product_id).collect::<Vec<_>>(), vec![s.platter, s.fries]);
        assert!(vendor_products(&s.store, 999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_image_and_defaults() {
        let s = seed().await;
        let images = images().await;
        let product = create_product(&s.store, &images, s.vendor, details("Siomai Rice", 6500, 30), Some(png("siomai.png"))).await.unwrap();
        assert_eq!(product.category, DEFAULT_CATEGORY);
        let url = product.image_url.clone().unwrap();
        assert!(file_of(&images, &url).exists());
        assert_eq!(get_product(&s.store, product.product_id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_create_for_unknown_vendor_discards_image() {
        let s = seed().await;
        let images = images().await;
        let result = create_product(&s.store, &images, 404, details("Ghost", 100, 1), Some(png("ghost.png"))).await;
        assert!(matches!(result, Err(MarketError::Validation(_))));
        assert_eq!(std::fs::read_dir(images.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_or_replaces_image() {
        let s = seed().await;
        let images = images().await;
        let product = create_product(&s.store, &images, s.vendor, details("Siomai Rice", 6500, 30), Some(png("a.png"))).await.unwrap();
        let first = product.image_url.clone().unwrap();

        let kept = update_product(&s.store, &images, product.product_id, details("Siomai Rice XL", 8000, 25), None).await.unwrap();
        assert_eq!(kept.image_url.as_deref(), Some(first.as_str()));
        assert_eq!(kept.price, money(8000));

        let replaced = update_product(&s.store, &images, product.product_id, details("Siomai Rice XL", 8000, 25), Some(png("b.png"))).await.unwrap();
        let second = replaced.image_url.unwrap();
        assert_ne!(first, second);
        assert!(!file_of(&images, &first).exists());
        assert!(file_of(&images, &second).exists());
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let s = seed().await;
        let images = images().await;
        let result = update_product(&s.store, &images, 12_345, details("Nope", 100, 1), Some(png("x.png"))).await;
        assert!(matches!(result, Err(MarketError::NotFound(_))));
        assert_eq!(std::fs::read_dir(images.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_order_lines() {
        let s = seed().await;
        let images = images().await;
        let lines = vec![
            CartLine { product_id: s.fries, quantity: Quantity::new(1).unwrap() },
            CartLine { product_id: s.platter, quantity: Quantity::new(1).unwrap() },
        ];
        let order = s.store.place_order(&Cart::new(s.buyer, s.vendor, "Gym", None, lines).unwrap()).await.unwrap();

        delete_product(&s.store, &images, s.fries).await.unwrap();
        assert!(matches!(get_product(&s.store, s.fries).await, Err(MarketError::NotFound(_))));
        let remaining = s.store.list_order_items(order.order_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].product_id, s.platter);

        assert!(matches!(delete_product(&s.store, &images, s.fries).await, Err(MarketError::NotFound(_))));
    }
}
