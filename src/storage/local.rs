//! Local-disk Storage Sink: keeps `<base>/inputs` and `<base>/processed`,
//! created once at construction and owned for the process lifetime.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::fs;

use crate::error::{ConfigError, StorageError};

use super::{StorageSink, StoredVideo};

#[derive(Debug)]
pub struct LocalStorage {
    inputs_dir: PathBuf,
    processed_dir: PathBuf,
}

impl LocalStorage {
    /// Creates `<uploads_dir>/inputs` and `<uploads_dir>/processed` if they
    /// don't already exist.
    pub fn new(uploads_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = uploads_dir.as_ref();
        let inputs_dir = base.join("inputs");
        let processed_dir = base.join("processed");
        std::fs::create_dir_all(&inputs_dir).map_err(|e| {
            ConfigError::new("UPLOADS_DIR", format!("failed to create {}: {e}", inputs_dir.display()))
        })?;
        std::fs::create_dir_all(&processed_dir).map_err(|e| {
            ConfigError::new(
                "UPLOADS_DIR",
                format!("failed to create {}: {e}", processed_dir.display()),
            )
        })?;
        Ok(Self {
            inputs_dir,
            processed_dir,
        })
    }

    async fn save(&self, dir: &Path, url_prefix: &str, path: &Path, name: &str) -> Result<StoredVideo, StorageError> {
        let target = dir.join(name);
        if path != target {
            fs::copy(path, &target).await?;
            log::debug!(
                target: "motion_trim::storage::local",
                "copied {} -> {}",
                path.display(),
                target.display()
            );
        }
        let metadata = fs::metadata(&target).await?;
        Ok(StoredVideo {
            name: name.to_string(),
            url: format!("{url_prefix}/{name}"),
            download_url: None,
            size: Some(metadata.len()),
            last_modified: metadata.modified().ok().map(OffsetDateTime::from),
        })
    }

    async fn list(&self, dir: &Path, url_prefix: &str) -> Result<Vec<StoredVideo>, StorageError> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            out.push(StoredVideo {
                name: name.clone(),
                url: format!("{url_prefix}/{name}"),
                download_url: None,
                size: Some(metadata.len()),
                last_modified: metadata.modified().ok().map(OffsetDateTime::from),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl StorageSink for LocalStorage {
    async fn save_input(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError> {
        self.save(&self.inputs_dir, "/uploads/inputs", path, name).await
    }

    async fn save_output(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError> {
        self.save(&self.processed_dir, "/uploads/processed", path, name).await
    }

    async fn list_inputs(&self) -> Result<Vec<StoredVideo>, StorageError> {
        self.list(&self.inputs_dir, "/uploads/inputs").await
    }

    async fn list_outputs(&self) -> Result<Vec<StoredVideo>, StorageError> {
        self.list(&self.processed_dir, "/uploads/processed").await
    }

    async fn output_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.processed_dir.join(name)).await?)
    }

    async fn get_output_url(&self, name: &str, _as_attachment: bool) -> Result<String, StorageError> {
        // Attachment disposition is a static-file-serving concern (out of
        // scope); the local sink always returns the plain relative URL.
        Ok(format!("/uploads/processed/{name}"))
    }

    fn local_input_dir(&self) -> &Path {
        &self.inputs_dir
    }

    fn local_output_dir(&self) -> &Path {
        &self.processed_dir
    }
}
