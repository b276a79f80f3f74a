//! Pipeline Orchestrator (component I): resolves the input, runs the
//! detector, drives the muxer, and persists both artifacts — mapping every
//! failure onto [`PipelineError`] and cleaning up scratch files on every
//! exit path.

use std::path::PathBuf;

use uuid::Uuid;

use crate::cleanup::TempCleanup;
use crate::config::MotionOptions;
use crate::error::{DownloadError, DownloadErrorKind, PipelineError};
use crate::fetch::fetch;
use crate::motion::detect::detect;
use crate::motion::mux::trim;
use crate::motion::segment::TimeRange;
use crate::storage::{StorageSink, StoredVideo};

/// Input to a single pipeline run. Exactly one of `video_path` / `video_url`
/// is expected to be populated by the caller; the orchestrator fetches the
/// latter to the storage sink's local input staging directory.
pub struct PipelineRequest<'a> {
    pub video_path: Option<PathBuf>,
    pub video_url: Option<String>,
    pub storage: &'a dyn StorageSink,
    pub motion_options: MotionOptions,
    pub max_bytes: Option<u64>,
    pub output_filename: Option<String>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub segments: Vec<TimeRange>,
    pub stored_input: Option<StoredVideo>,
    pub stored_output: StoredVideo,
}

/// Filename stamped on the muxer's output when the caller doesn't supply one:
/// `trimmed-<uuid>.mp4`.
fn default_output_name() -> String {
    format!("trimmed-{}.mp4", Uuid::new_v4())
}

/// Validates that `name` matches the `trimmed-<uuid>.mp4` shape consumers
/// exposing downloads are expected to check before serving a file, to
/// prevent path traversal via a caller-supplied filename.
pub fn is_valid_output_filename(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("trimmed-") else {
        return false;
    };
    let Some(uuid_part) = rest.strip_suffix(".mp4") else {
        return false;
    };
    Uuid::parse_str(uuid_part).is_ok()
}

/// Runs the full pipeline: resolve input -> save input -> detect -> mux ->
/// save output. See §4.I of the design for the exact step ordering and
/// cleanup-ownership rules.
pub async fn run(request: PipelineRequest<'_>) -> Result<PipelineResult, PipelineError> {
    let mut cleanup = TempCleanup::new();

    let video_path = match request.video_path {
        Some(path) => path,
        None => match request.video_url.as_deref() {
            Some(url) => {
                let dest_dir = request.storage.local_input_dir();
                let path = fetch(url, dest_dir, request.max_bytes).await?;
                cleanup.add(path.clone());
                path
            }
            None => {
                return Err(PipelineError::Download(DownloadError::new(
                    DownloadErrorKind::NoVideo,
                    "no video provided",
                )));
            }
        },
    };

    let basename = video_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.mp4")
        .to_string();

    let stored_input = request
        .storage
        .save_input(&video_path, &basename)
        .await
        .map_err(PipelineError::Storage)?;

    let (segments, metadata) = detect(&video_path, request.motion_options).await?;
    if segments.is_empty() {
        return Err(PipelineError::NoSegments);
    }

    let output_name = request.output_filename.unwrap_or_else(default_output_name);
    let output_path = request.storage.local_output_dir().join(&output_name);
    cleanup.add(output_path.clone());

    trim(&video_path, &segments, metadata.has_audio, &output_path).await?;

    let stored_output = request
        .storage
        .save_output(&output_path, &output_name)
        .await
        .map_err(PipelineError::Storage)?;

    // Every artifact is now owned by the storage sink; nothing tracked by
    // `cleanup` should be deleted on the way out.
    cleanup.keep();

    log::info!(
        target: "motion_trim::pipeline",
        "pipeline finished: {} segment(s) -> {}",
        segments.len(),
        stored_output.url
    );

    Ok(PipelineResult {
        segments,
        stored_input: Some(stored_input),
        stored_output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_name_matches_expected_shape() {
        let name = default_output_name();
        assert!(is_valid_output_filename(&name));
    }

    #[test]
    fn is_valid_output_filename_accepts_well_formed_names() {
        assert!(is_valid_output_filename(
            "trimmed-550e8400-e29b-41d4-a716-446655440000.mp4"
        ));
    }

    #[test]
    fn is_valid_output_filename_rejects_traversal_and_malformed_names() {
        assert!(!is_valid_output_filename("../../etc/passwd"));
        assert!(!is_valid_output_filename("trimmed-not-a-uuid.mp4"));
        assert!(!is_valid_output_filename("trimmed-550e8400-e29b-41d4-a716-446655440000.mov"));
        assert!(!is_valid_output_filename("550e8400-e29b-41d4-a716-446655440000.mp4"));
    }

    #[tokio::test]
    async fn run_fails_with_no_video_when_neither_path_nor_url_given() {
        let storage = crate::storage::LocalStorage::new(tempfile::tempdir().unwrap().path()).unwrap();
        let request = PipelineRequest {
            video_path: None,
            video_url: None,
            storage: &storage,
            motion_options: MotionOptions::default(),
            max_bytes: None,
            output_filename: None,
        };
        let result = run(request).await;
        assert!(matches!(
            result,
            Err(PipelineError::Download(DownloadError {
                kind: DownloadErrorKind::NoVideo,
                ..
            }))
        ));
    }
}
