//! Raw Frame Extractor (component B): drives ffmpeg to produce a headerless
//! stream of downscaled 8-bit grayscale frames, sampled at a fixed rate.

use std::path::Path;

use crate::error::ExtractionError;
use crate::ffmpeg::runner::run_ffmpeg;
use crate::motion::score::FRAME_SIZE;

const FRAME_WIDTH: u32 = 160;
const FRAME_HEIGHT: u32 = 90;

fn ffmpeg_base_args() -> Vec<String> {
    vec![
        "-nostdin".to_string(),
        "-threads".to_string(),
        "0".to_string(),
    ]
}

/// Builds the argument list for the sample/scale/grayscale extraction pass.
/// Frame size of the produced raw stream is always [`FRAME_SIZE`] bytes
/// (`160 * 90`, validated by a test below).
fn build_extract_args(input_path: &str, sample_fps: f64, out_path: &str) -> Vec<String> {
    let mut args = ffmpeg_base_args();
    args.extend([
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string(),
        "-vf".to_string(),
        format!("fps={sample_fps},scale={FRAME_WIDTH}:{FRAME_HEIGHT},format=gray"),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "gray".to_string(),
        out_path.to_string(),
    ]);
    args
}

/// Extracts a raw grayscale frame stream from `path`, sampled at `sample_fps`,
/// into `out_path`. Fails with [`ExtractionError`] on a non-zero ffmpeg exit.
pub async fn extract(path: &Path, sample_fps: f64, out_path: &Path) -> Result<(), ExtractionError> {
    let args = build_extract_args(
        &path.to_string_lossy(),
        sample_fps,
        &out_path.to_string_lossy(),
    );
    log::debug!(
        target: "motion_trim::motion::extract",
        "extracting raw grayscale frames at {sample_fps} fps -> {}",
        out_path.display()
    );
    run_ffmpeg(args)
        .await
        .map_err(|e| ExtractionError(format!("ffmpeg extraction failed: {}", e.stderr_preview(3))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_matches_160x90_grayscale() {
        assert_eq!(FRAME_SIZE, (FRAME_WIDTH * FRAME_HEIGHT) as usize);
        assert_eq!(FRAME_SIZE, 14_400);
    }

    #[test]
    fn build_extract_args_sets_sample_fps_and_scale() {
        let args = build_extract_args("/in.mp4", 2.0, "/out.raw");
        let vf = args
            .iter()
            .position(|a| a == "-vf")
            .and_then(|i| args.get(i + 1))
            .expect("-vf present");
        assert!(vf.contains("fps=2"));
        assert!(vf.contains("scale=160:90"));
        assert!(vf.contains("format=gray"));
        assert!(args.contains(&"rawvideo".to_string()));
        assert!(args.contains(&"gray".to_string()));
        assert_eq!(args.last(), Some(&"/out.raw".to_string()));
    }
}
