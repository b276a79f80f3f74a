//! Azure Blob Storage Sink: the remote backend, selected when
//! `AZURE_STORAGE_CONNECTION_STRING` is present. Uploads to
//! `<container>/<prefix>/<name>` and returns short-lived signed read URLs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use azure_core::StatusCode;
use azure_core::error::ErrorKind as AzureErrorKind;
use azure_storage::prelude::*;
use azure_storage_blobs::prelude::*;
use futures_util::StreamExt;
use time::OffsetDateTime;
use tokio::sync::OnceCell;

use crate::error::{ConfigError, StorageError};

use super::{StorageSink, StoredVideo, guess_content_type};

/// Signed read URLs default to a one-hour lifetime, matching the spec's
/// "short-lived" characterisation for presented download links.
const SIGNED_URL_TTL: time::Duration = time::Duration::minutes(60);

fn parse_connection_string(connection_string: &str) -> Result<(String, String), ConfigError> {
    let mut account = None;
    let mut key = None;
    for part in connection_string.split(';') {
        if let Some(v) = part.strip_prefix("AccountName=") {
            account = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("AccountKey=") {
            key = Some(v.to_string());
        }
    }
    match (account, key) {
        (Some(account), Some(key)) => Ok((account, key)),
        _ => Err(ConfigError::new(
            "AZURE_STORAGE_CONNECTION_STRING",
            "must contain AccountName= and AccountKey=",
        )),
    }
}

fn is_not_found(err: &azure_core::Error) -> bool {
    matches!(
        err.kind(),
        AzureErrorKind::HttpResponse { status, .. } if *status == StatusCode::NotFound
    )
}

pub struct AzureBlobStorage {
    container_client: ContainerClient,
    input_folder: String,
    output_folder: String,
    /// Local scratch directories used purely for staging before upload /
    /// after download; the blob container is the artifacts' actual home.
    staging_inputs: PathBuf,
    staging_outputs: PathBuf,
    container_ready: OnceCell<()>,
}

impl AzureBlobStorage {
    pub fn new(
        connection_string: &str,
        container: &str,
        input_folder: &str,
        output_folder: &str,
    ) -> Result<Self, ConfigError> {
        let (account, key) = parse_connection_string(connection_string)?;
        let credentials = StorageCredentials::access_key(account.clone(), key);
        let container_client = ClientBuilder::new(account, credentials).container_client(container);

        let staging_root = std::env::temp_dir().join("motion-trim-blob-staging");
        let staging_inputs = staging_root.join("inputs");
        let staging_outputs = staging_root.join("processed");
        std::fs::create_dir_all(&staging_inputs).map_err(|e| {
            ConfigError::new("AZURE_STORAGE_CONTAINER", format!("failed to create staging dir: {e}"))
        })?;
        std::fs::create_dir_all(&staging_outputs).map_err(|e| {
            ConfigError::new("AZURE_STORAGE_CONTAINER", format!("failed to create staging dir: {e}"))
        })?;

        Ok(Self {
            container_client,
            input_folder: input_folder.to_string(),
            output_folder: output_folder.to_string(),
            staging_inputs,
            staging_outputs,
            container_ready: OnceCell::new(),
        })
    }

    /// One-shot create-if-absent, awaited by every first operation so it is
    /// idempotent under concurrency (see §5 of the design).
    async fn ensure_container_ready(&self) -> Result<(), StorageError> {
        self.container_ready
            .get_or_try_init(|| async {
                match self.container_client.create().await {
                    Ok(_) => Ok(()),
                    Err(e) if matches!(e.kind(), AzureErrorKind::HttpResponse { status, .. } if *status == StatusCode::Conflict) => {
                        Ok(())
                    }
                    Err(e) => Err(StorageError::new(e)),
                }
            })
            .await
            .map(|_| ())
    }

    fn blob_name(folder: &str, name: &str) -> String {
        format!("{folder}/{name}")
    }

    async fn signed_url(&self, blob_name: &str, as_attachment: bool, name: &str) -> Result<String, StorageError> {
        let blob_client = self.container_client.blob_client(blob_name);
        let expiry = OffsetDateTime::now_utc() + SIGNED_URL_TTL;
        let permissions = BlobSasPermissions {
            read: true,
            ..Default::default()
        };
        let mut sas = blob_client
            .shared_access_signature(permissions, expiry)
            .await
            .map_err(StorageError::new)?;
        if as_attachment {
            sas = sas.content_disposition(format!("attachment; filename=\"{name}\""));
        }
        blob_client
            .generate_signed_blob_url(&sas)
            .map(|u| u.to_string())
            .map_err(StorageError::new)
    }

    async fn upload(
        &self,
        folder: &str,
        staging_dir: &Path,
        path: &Path,
        name: &str,
        discard_staging_copy: bool,
    ) -> Result<StoredVideo, StorageError> {
        self.ensure_container_ready().await?;
        let blob_name = Self::blob_name(folder, name);
        let data = tokio::fs::read(path).await?;
        let size = data.len() as u64;

        let blob_client = self.container_client.blob_client(&blob_name);
        blob_client
            .put_block_blob(data)
            .content_type(guess_content_type(name))
            .await
            .map_err(StorageError::new)?;

        // The staging copy is scratch for this sink, not canonical storage,
        // but the *input* staging file is still `video_path` in the
        // orchestrator's hands at this point — the detector and muxer read
        // it again after `save_input` returns (§4.I steps 4/6). Only the
        // output staging copy is safe to discard here: nothing reads the
        // muxer's output file again once it has been uploaded. Best-effort:
        // a failed cleanup here doesn't affect correctness.
        if discard_staging_copy && path.starts_with(staging_dir) {
            let _ = tokio::fs::remove_file(path).await;
        }

        let url = self.signed_url(&blob_name, false, name).await?;
        log::info!(
            target: "motion_trim::storage::azure_blob",
            "uploaded {name} ({size} bytes) -> {blob_name}"
        );
        Ok(StoredVideo {
            name: name.to_string(),
            url,
            download_url: None,
            size: Some(size),
            last_modified: Some(OffsetDateTime::now_utc()),
        })
    }

    async fn list(&self, folder: &str) -> Result<Vec<StoredVideo>, StorageError> {
        self.ensure_container_ready().await?;
        let prefix = format!("{folder}/");
        let mut stream = self
            .container_client
            .list_blobs()
            .prefix(prefix.clone())
            .into_stream();

        let mut out = Vec::new();
        while let Some(page) = stream.next().await {
            let page = page.map_err(StorageError::new)?;
            for blob in page.blobs.blobs() {
                let name = blob
                    .name
                    .strip_prefix(&prefix)
                    .unwrap_or(&blob.name)
                    .to_string();
                let url = self.signed_url(&blob.name, false, &name).await?;
                out.push(StoredVideo {
                    name,
                    url,
                    download_url: None,
                    size: Some(blob.properties.content_length),
                    last_modified: Some(blob.properties.last_modified),
                });
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl StorageSink for AzureBlobStorage {
    async fn save_input(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError> {
        self.upload(&self.input_folder, &self.staging_inputs, path, name, false).await
    }

    async fn save_output(&self, path: &Path, name: &str) -> Result<StoredVideo, StorageError> {
        self.upload(&self.output_folder, &self.staging_outputs, path, name, true).await
    }

    async fn list_inputs(&self) -> Result<Vec<StoredVideo>, StorageError> {
        self.list(&self.input_folder).await
    }

    async fn list_outputs(&self) -> Result<Vec<StoredVideo>, StorageError> {
        self.list(&self.output_folder).await
    }

    async fn output_exists(&self, name: &str) -> Result<bool, StorageError> {
        self.ensure_container_ready().await?;
        let blob_name = Self::blob_name(&self.output_folder, name);
        let blob_client = self.container_client.blob_client(&blob_name);
        match blob_client.get_properties().await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::new(e)),
        }
    }

    async fn get_output_url(&self, name: &str, as_attachment: bool) -> Result<String, StorageError> {
        self.ensure_container_ready().await?;
        let blob_name = Self::blob_name(&self.output_folder, name);
        self.signed_url(&blob_name, as_attachment, name).await
    }

    fn local_input_dir(&self) -> &Path {
        &self.staging_inputs
    }

    fn local_output_dir(&self) -> &Path {
        &self.staging_outputs
    }
}
