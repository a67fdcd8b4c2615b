//! Request extractors that reject with [`MarketError`] JSON bodies.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::uploads::Upload;
use crate::{MarketError, Result};

/// `Json<T>` that also runs `T`'s validation rules.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = MarketError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await
            .map_err(|rejection| MarketError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// A path parameter such as `/orders/:id`. Unparseable values are a 400.
pub struct PathId<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathId<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = MarketError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await
            .map_err(|rejection| MarketError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// A drained multipart form. Field names are matched case-insensitively,
/// so `ImageFile` and `imageFile` are the same field.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

#[async_trait]
impl<S> FromRequest<S> for Form
where
    S: Send + Sync,
{
    type Rejection = MarketError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let multipart = Multipart::from_request(req, state).await
            .map_err(|rejection| MarketError::Validation(rejection.body_text()))?;
        Form::read(multipart).await
    }
}

impl Form {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| MarketError::Validation(e.body_text()))? {
            let Some(name) = field.name().map(str::to_ascii_lowercase) else { continue };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| MarketError::Validation(e.body_text()))?;
                    // browsers send an empty part when no file was picked
                    if file_name.is_empty() && bytes.is_empty() { continue; }
                    form.files.insert(name, Upload { file_name, bytes: bytes.to_vec() });
                }
                None => {
                    let text = field.text().await.map_err(|e| MarketError::Validation(e.body_text()))?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.text(name).ok_or_else(|| MarketError::Validation(format!("{name} is required")))
    }

    /// Value exactly as sent. Blank input still counts as missing.
    pub fn secret(&self, name: &str) -> Result<String> {
        self.fields.get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| MarketError::Validation(format!("{name} is required")))
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
