//! Photo file storage backends.
//!
//! Stores uploaded photo bytes and hands back stable references (relative
//! keys). The keys are persisted on photo rows and resolved through the
//! static `/uploads` boundary. No per-file update is exposed; files are only
//! removed in bulk when the owning ad is deleted.

use crate::config::UploadConfig;
use crate::db::errors::{DbError, Result};
use crate::types::AdId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for photo storage backends
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Store photo content for an ad and return the storage key
    async fn store(&self, ad_id: AdId, content: &[u8], original_name: &str) -> Result<String>;

    /// Delete photo content using its storage key
    async fn delete(&self, storage_key: &str) -> Result<()>;

    /// Check if a photo exists using its storage key
    async fn exists(&self, storage_key: &str) -> Result<bool>;
}

/// Keep the original file name recognizable in the stored key while dropping
/// anything that could escape the upload directory.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() { "photo".to_string() } else { cleaned }
}

// ============================================================================
// Local Filesystem Storage Implementation
// ============================================================================

/// Local filesystem storage backend - stores files under a base directory
/// which is also the root served at `/uploads`.
pub struct LocalPhotoStorage {
    base_path: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn store(&self, ad_id: AdId, content: &[u8], original_name: &str) -> Result<String> {
        // Timestamp plus original name, namespaced per ad, keeps concurrent
        // uploads from colliding
        let timestamp = chrono::Utc::now().timestamp_millis();
        let storage_key = format!("ads/{ad_id}/{timestamp}-{}", sanitize_file_name(original_name));

        let full_path = self.base_path.join(&storage_key);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write file
        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        Ok(storage_key)
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        let full_path = self.base_path.join(storage_key);

        if full_path.exists() {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> Result<bool> {
        let full_path = self.base_path.join(storage_key);
        Ok(full_path.exists())
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create the photo storage backend from configuration, ensuring the storage
/// directory exists.
pub async fn create_photo_storage(config: &UploadConfig) -> Result<Arc<dyn PhotoStorage>> {
    tracing::info!("Creating local photo storage backend (path: {:?})", config.dir);
    if let Err(e) = fs::create_dir_all(&config.dir).await {
        return Err(DbError::Other(anyhow::anyhow!(
            "Failed to create photo storage directory {:?}: {}",
            config.dir,
            e
        )));
    }
    Ok(Arc::new(LocalPhotoStorage::new(config.dir.clone())))
}
