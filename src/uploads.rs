//! Image storage on local disk.
//!
//! Files are written as `{uuid}_{name}` under the upload directory and served
//! back at `{public_base_url}/uploads/{file}`.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{MarketError, Result};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// A file received in a multipart form.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    /// Creates the upload directory when missing.
    pub async fn open(dir: impl Into<PathBuf>, public_base_url: &str) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await
            .map_err(|e| MarketError::Config(format!("cannot create upload dir {}: {e}", dir.display())))?;
        Ok(Self { dir, public_base_url: public_base_url.trim_end_matches('/').to_string() })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Stores the upload and returns its public URL.
    pub async fn save(&self, upload: &Upload) -> Result<String> {
        if upload.bytes.is_empty() {
            return Err(MarketError::Validation("Uploaded image is empty".to_string()));
        }
        let name = sanitize(&upload.file_name);
        let extension = Path::new(&name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        if !extension.as_deref().is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e)) {
            return Err(MarketError::Validation(format!("Unsupported image type: {}", upload.file_name)));
        }
        let stored = format!("{}_{}", Uuid::new_v4(), name);
        tokio::fs::write(self.dir.join(&stored), &upload.bytes).await
            .map_err(|e| MarketError::Internal(format!("failed to store image: {e}")))?;
        debug!(file = %stored, bytes = upload.bytes.len(), "image stored");
        Ok(format!("{}/uploads/{}", self.public_base_url, stored))
    }

    /// Best-effort removal of a file previously returned by [`ImageStore::save`].
    pub async fn discard(&self, url: &str) {
        let Some(file) = url.strip_prefix(&format!("{}/uploads/", self.public_base_url)) else { return };
        if file.contains('/') || file.contains("..") { return; }
        if let Err(e) = tokio::fs::remove_file(self.dir.join(file)).await {
            warn!(error = %e, file, "could not remove image");
        }
    }
}

/// Keeps the last path component and replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "image".to_string() } else { cleaned }
}
