//! Trim Muxer (component F): drives ffmpeg with a trim+concat filter graph
//! to produce a single re-encoded output covering only the given segments.

use std::path::Path;

use crate::error::MuxError;
use crate::ffmpeg::runner::run_ffmpeg;
use crate::motion::segment::TimeRange;

fn ffmpeg_base_args() -> Vec<String> {
    vec![
        "-nostdin".to_string(),
        "-threads".to_string(),
        "0".to_string(),
    ]
}

/// Builds the `filter_complex` graph: one `trim`/`setpts` pair per segment
/// (plus `atrim`/`asetpts` when `has_audio`), concatenated into `[outv]`
/// (and `[outa]` when audio is present).
fn build_filter_complex(segments: &[TimeRange], has_audio: bool) -> String {
    let mut parts = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        parts.push(format!(
            "[0:v]trim=start={:.6}:end={:.6},setpts=PTS-STARTPTS[v{i}]",
            seg.start, seg.end
        ));
        if has_audio {
            parts.push(format!(
                "[0:a]atrim=start={:.6}:end={:.6},asetpts=PTS-STARTPTS[a{i}]",
                seg.start, seg.end
            ));
        }
    }

    let concat_inputs: String = if has_audio {
        (0..segments.len())
            .map(|i| format!("[v{i}][a{i}]"))
            .collect()
    } else {
        (0..segments.len()).map(|i| format!("[v{i}]")).collect()
    };
    let audio_flag = if has_audio { 1 } else { 0 };
    let concat_outputs = if has_audio {
        "[outv][outa]"
    } else {
        "[outv]"
    };
    parts.push(format!(
        "{concat_inputs}concat=n={}:v=1:a={audio_flag}{concat_outputs}",
        segments.len()
    ));

    parts.join(";")
}

/// Builds the full ffmpeg argument list for a trim+concat+re-encode pass.
fn build_mux_args(input_path: &str, segments: &[TimeRange], has_audio: bool, output_path: &str) -> Vec<String> {
    let filter_complex = build_filter_complex(segments, has_audio);
    let mut args = ffmpeg_base_args();
    args.extend([
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string(),
        "-filter_complex".to_string(),
        filter_complex,
        "-map".to_string(),
        "[outv]".to_string(),
    ]);
    if has_audio {
        args.extend(["-map".to_string(), "[outa]".to_string()]);
    }
    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]);
    if has_audio {
        args.extend(["-c:a".to_string(), "aac".to_string()]);
    }
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args.push(output_path.to_string());
    args
}

/// Trims `input` down to `segments` and muxes the result into `output` as a
/// single re-encoded MP4. Fails with [`MuxError::EmptyInput`] if `segments`
/// is empty, or [`MuxError::ToolFailed`] if ffmpeg exits non-zero.
pub async fn trim(
    input: &Path,
    segments: &[TimeRange],
    has_audio: bool,
    output: &Path,
) -> Result<(), MuxError> {
    if segments.is_empty() {
        return Err(MuxError::EmptyInput);
    }

    let args = build_mux_args(
        &input.to_string_lossy(),
        segments,
        has_audio,
        &output.to_string_lossy(),
    );
    log::debug!(
        target: "motion_trim::motion::mux",
        "muxing {} segment(s) (audio={has_audio}) -> {}",
        segments.len(),
        output.display()
    );
    run_ffmpeg(args).await.map_err(|e| {
        MuxError::ToolFailed(format!("ffmpeg mux failed: {}", e.stderr_preview(3)))
    })
}
