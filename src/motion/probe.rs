//! Media Probe (component A): duration, resolution, frame rate, and audio
//! presence for a video file, via `ffprobe -show_format -show_streams`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ProbeError;
use crate::ffmpeg::runner::run_ffprobe_capture;

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

/// Parses a rational (`"num/den"`) or bare decimal frame rate string.
fn parse_frame_rate(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 { None } else { Some(num / den) }
        }
        None => s.trim().parse().ok(),
    }
}

/// Duration, resolution, frame rate, and audio-stream presence for a probed video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

/// Parses ffprobe's JSON output into [`VideoMetadata`]. Fails when no video
/// stream is present, per the Media Probe's contract.
pub fn parse_ffprobe_json(json: &str) -> Result<VideoMetadata, ProbeError> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| ProbeError(format!("invalid ffprobe JSON: {e}")))?;

    let duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ProbeError("ffprobe output has no duration".into()))?;

    let streams = output.streams.unwrap_or_default();
    let video_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ProbeError("no video stream found".into()))?;

    let width = video_stream
        .width
        .ok_or_else(|| ProbeError("video stream has no width".into()))?;
    let height = video_stream
        .height
        .ok_or_else(|| ProbeError("video stream has no height".into()))?;
    let fps = video_stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .ok_or_else(|| ProbeError("video stream has no usable frame rate".into()))?;

    let has_audio = streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoMetadata {
        duration,
        width,
        height,
        fps,
        has_audio,
    })
}

/// Probes `path` via `ffprobe` and returns its [`VideoMetadata`].
pub async fn probe(path: &Path) -> Result<VideoMetadata, ProbeError> {
    let path_str = path.to_string_lossy().to_string();
    log::debug!(target: "motion_trim::motion::probe", "probing {path_str}");

    let args = vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path_str,
    ];
    let json = run_ffprobe_capture(args)
        .await
        .map_err(|e| ProbeError(format!("ffprobe failed: {}", e.stderr_preview(3))))?;
    parse_ffprobe_json(&json)
}

/// Convenience overload accepting an owned path, mirroring callers that hold
/// a `PathBuf` across an await boundary.
pub async fn probe_owned(path: PathBuf) -> Result<VideoMetadata, ProbeError> {
    probe(&path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_metadata_with_audio() {
        let json = r#"{
            "format": { "duration": "30.5" },
            "streams": [
                { "codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "30/1" },
                { "codec_type": "audio" }
            ]
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert_eq!(meta.duration, 30.5);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.fps - 30.0).abs() < 0.01);
        assert!(meta.has_audio);
    }

    #[test]
    fn extracts_metadata_without_audio() {
        let json = r#"{
            "format": { "duration": "12.0" },
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360, "r_frame_rate": "25/1" }
            ]
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert!(!meta.has_audio);
    }

    #[test]
    fn parse_frame_rate_handles_ntsc_rational() {
        let fps = parse_frame_rate("24000/1001").unwrap();
        assert!((fps - 23.976).abs() < 0.001);
    }

    #[test]
    fn parse_frame_rate_handles_bare_decimal() {
        let fps = parse_frame_rate("29.97").unwrap();
        assert!((fps - 29.97).abs() < 0.001);
    }

    #[test]
    fn parse_frame_rate_rejects_zero_denominator() {
        assert_eq!(parse_frame_rate("30/0"), None);
    }

    #[test]
    fn fails_when_no_video_stream_present() {
        let json = r#"{
            "format": { "duration": "10.0" },
            "streams": [{ "codec_type": "audio" }]
        }"#;
        assert!(parse_ffprobe_json(json).is_err());
    }

    #[test]
    fn fails_on_malformed_json() {
        assert!(parse_ffprobe_json("not json").is_err());
    }

    #[test]
    fn fails_on_empty_streams() {
        let json = r#"{"format": {"duration": "5.0"}, "streams": []}"#;
        assert!(parse_ffprobe_json(json).is_err());
    }
}
