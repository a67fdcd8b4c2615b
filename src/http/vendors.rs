use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::extract::{PathId, ValidatedJson};
use super::AppState;
use crate::domain::aggregates::{Vendor, VendorId, VendorListing, VerificationStatus};
use crate::services::vendors;
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShopOpenRequest {
    pub is_open: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerificationRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

pub async fn set_shop_open(State(s): State<AppState>, PathId(id): PathId<VendorId>, ValidatedJson(req): ValidatedJson<ShopOpenRequest>) -> Result<Json<Vendor>> {
    Ok(Json(vendors::set_shop_open(s.store.as_ref(), id, req.is_open).await?))
}

pub async fn list_vendors(State(s): State<AppState>) -> Result<Json<Vec<VendorListing>>> {
    Ok(Json(vendors::list_vendors(s.store.as_ref()).await?))
}

pub async fn set_verification(State(s): State<AppState>, PathId(id): PathId<VendorId>, ValidatedJson(req): ValidatedJson<VerificationRequest>) -> Result<Json<Vendor>> {
    let status: VerificationStatus = req.status.parse()?;
    Ok(Json(vendors::set_verification(s.store.as_ref(), &s.publisher, id, status).await?))
}

pub async fn delete_vendor(State(s): State<AppState>, PathId(id): PathId<VendorId>) -> Result<Json<Value>> {
    vendors::delete_vendor(s.store.as_ref(), &s.images, id).await?;
    Ok(Json(json!({ "message": "Vendor deleted" })))
}
