//! Storage Sink (component H): saves/lists/looks up input and output
//! artifacts behind one capability trait, backed by either a local directory
//! or an Azure Blob Storage container. The backend is picked once, at
//! construction, from [`crate::config::StorageConfig`].

mod azure_blob;
mod local;

use std::path::Path;

use async_trait::async_trait;
use time::OffsetDateTime;

pub use azure_blob::AzureBlobStorage;
pub use local::LocalStorage;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;

/// Descriptor returned for a saved or listed artifact. `url` is always a
/// dereferenceable location; `download_url` is populated only when the
/// backend can force attachment disposition (the blob sink's signed URLs).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVideo {
    pub name: String,
    pub url: String,
    pub download_url: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<OffsetDateTime>,
}

/// Guesses a video MIME type from a file name's extension, per the shared
/// rule both storage backends use: `.webm -> video/webm`, `.mov ->
/// video/quicktime`, `.avi -> video/x-msvideo`, else `video/mp4`.
pub fn guess_content_type(name: &str) -> &'static str {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Capability interface shared by both storage backends. Trait object safe
/// so the orchestrator can hold `Arc<dyn StorageSink>` without knowing which
/// backend it was constructed with.
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn save_input(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError>;
    async fn save_output(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError>;
    async fn list_inputs(&self) -> Result<Vec<StoredVideo>, StorageError>;
    async fn list_outputs(&self) -> Result<Vec<StoredVideo>, StorageError>;
    async fn output_exists(&self, name: &str) -> Result<bool, StorageError>;
    async fn get_output_url(&self, name: &str, as_attachment: bool) -> Result<String, StorageError>;

    /// Local staging directory for inbound artifacts. For the local backend
    /// this is also the final resting place; for the blob backend it is
    /// scratch space the orchestrator downloads into before `save_input`
    /// uploads it.
    fn local_input_dir(&self) -> &Path;

    /// Local staging directory for the muxer's output, before `save_output`
    /// persists it to its final backend.
    fn local_output_dir(&self) -> &Path;
}

/// Builds the configured storage backend. Blob mode when
/// [`StorageConfig`] resolved `AZURE_STORAGE_CONNECTION_STRING`; local disk
/// otherwise.
pub fn build(config: &StorageConfig) -> Result<Box<dyn StorageSink>, crate::error::ConfigError> {
    match &config.backend {
        StorageBackend::Local { uploads_dir } => {
            Ok(Box::new(LocalStorage::new(uploads_dir)?))
        }
        StorageBackend::AzureBlob {
            connection_string,
            container,
            input_folder,
            output_folder,
        } => Ok(Box::new(AzureBlobStorage::new(
            connection_string,
            container,
            input_folder,
            output_folder,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_content_type_matches_known_extensions() {
        assert_eq!(guess_content_type("clip.webm"), "video/webm");
        assert_eq!(guess_content_type("CLIP.MOV"), "video/quicktime");
        assert_eq!(guess_content_type("clip.avi"), "video/x-msvideo");
        assert_eq!(guess_content_type("clip.mp4"), "video/mp4");
    }

    #[test]
    fn guess_content_type_defaults_to_mp4_for_unknown_or_missing_extension() {
        assert_eq!(guess_content_type("clip"), "video/mp4");
        assert_eq!(guess_content_type("clip.mkv"), "video/mp4");
    }
}
