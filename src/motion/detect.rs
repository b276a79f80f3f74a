//! Wires components A-E together: probe the source, extract a raw grayscale
//! frame stream, score it, smooth it, and segment it into time ranges. The
//! scratch frame file is scoped to this call and removed on every exit path.

use std::path::Path;

use crate::cleanup::TempCleanup;
use crate::config::MotionOptions;
use crate::error::PipelineError;
use crate::ffmpeg::temp::TempFileManager;
use crate::motion::extract::extract;
use crate::motion::probe::{probe, VideoMetadata};
use crate::motion::score::{score, FRAME_SIZE};
use crate::motion::segment::{segment, TimeRange};
use crate::motion::smooth::smooth;

/// Runs the full probe -> extract -> score -> smooth -> segment pipeline
/// against `path`, returning the detected time ranges together with the
/// probed metadata (the orchestrator needs `has_audio` for the muxer).
pub async fn detect(
    path: &Path,
    options: MotionOptions,
) -> Result<(Vec<TimeRange>, VideoMetadata), PipelineError> {
    let metadata = probe(path).await?;

    let temp = TempFileManager;
    let raw_path = temp.create("frames.raw", None).map_err(PipelineError::Io)?;
    let mut cleanup = TempCleanup::new();
    cleanup.add(raw_path.clone());

    extract(path, options.sample_fps, &raw_path).await?;

    let raw_bytes = tokio::fs::read(&raw_path).await.map_err(PipelineError::Io)?;
    // cleanup drops (and deletes raw_path) at the end of this function's scope
    // regardless of which branch below returns.

    // score/smooth/segment are pure CPU loops with no suspension points; run
    // them on a blocking-pool thread so they don't stall the runtime's
    // worker threads on a large raw frame buffer.
    let duration = metadata.duration;
    let segments = tokio::task::spawn_blocking(move || {
        let raw_scores = score(&raw_bytes, FRAME_SIZE);
        let smoothed = smooth(&raw_scores, options.smoothing_window);
        segment(
            &smoothed,
            options.sample_fps,
            options.threshold,
            options.min_segment_length,
            options.pre_roll,
            options.post_roll,
            duration,
        )
    })
    .await
    .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;

    drop(cleanup);
    Ok((segments, metadata))
}
