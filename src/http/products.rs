use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::extract::{Form, PathId};
use super::AppState;
use crate::domain::aggregates::{CatalogEntry, Product, ProductDetails, ProductId, VendorId};
use crate::domain::value_objects::Money;
use crate::services::catalog;
use crate::{MarketError, Result};

const IMAGE_FIELD: &str = "imagefile";

/// Reads the editable product fields. Stock defaults to zero.
fn product_details(form: &Form) -> Result<ProductDetails> {
    let price: Money = form.require("price")?.parse()?;
    let stock_quantity = match form.text("stockquantity") {
        Some(raw) => raw.parse::<i32>().map_err(|_| MarketError::Validation(format!("Invalid stock quantity '{raw}'")))?,
        None => 0,
    };
    let details = ProductDetails::new(form.text("name").unwrap_or_default(), price, stock_quantity, form.text("category"), form.text("description"))?;
    Ok(details)
}

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<CatalogEntry>>> {
    Ok(Json(catalog::list_products(s.store.as_ref()).await?))
}

pub async fn vendor_products(State(s): State<AppState>, PathId(vendor_id): PathId<VendorId>) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog::vendor_products(s.store.as_ref(), vendor_id).await?))
}

pub async fn get_product(State(s): State<AppState>, PathId(id): PathId<ProductId>) -> Result<Json<Product>> {
    Ok(Json(catalog::get_product(s.store.as_ref(), id).await?))
}

pub async fn create_product(State(s): State<AppState>, mut form: Form) -> Result<(StatusCode, Json<Product>)> {
    let vendor_id: VendorId = form.require("vendorid")?.parse()
        .map_err(|_| MarketError::Validation("Invalid vendorId".to_string()))?;
    let details = product_details(&form)?;
    let image = form.take_file(IMAGE_FIELD);
    let product = catalog::create_product(s.store.as_ref(), &s.images, vendor_id, details, image).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, PathId(id): PathId<ProductId>, mut form: Form) -> Result<Json<Product>> {
    let details = product_details(&form)?;
    let image = form.take_file(IMAGE_FIELD);
    Ok(Json(catalog::update_product(s.store.as_ref(), &s.images, id, details, image).await?))
}

pub async fn delete_product(State(s): State<AppState>, PathId(id): PathId<ProductId>) -> Result<Json<Value>> {
    catalog::delete_product(s.store.as_ref(), &s.images, id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}
