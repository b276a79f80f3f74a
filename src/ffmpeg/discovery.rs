//! Locates the `ffmpeg`/`ffprobe` binaries the pipeline drives as subprocesses.
//! Resolution order: `FFMPEG_PATH`/`FFPROBE_PATH` env override -> common
//! installation paths -> `PATH` lookup. The result is cached for the process
//! lifetime once found.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

#[cfg(target_os = "windows")]
const FIND_CMD: &str = "where";
#[cfg(not(target_os = "windows"))]
const FIND_CMD: &str = "which";

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let output = Command::new(FIND_CMD).arg(binary).output().ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

fn common_paths(binary: &str) -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    return vec![
        PathBuf::from(format!("/opt/homebrew/bin/{binary}")),
        PathBuf::from(format!("/usr/local/bin/{binary}")),
        PathBuf::from(format!("/opt/local/bin/{binary}")),
    ];
    #[cfg(target_os = "windows")]
    return vec![
        PathBuf::from(format!("C:\\ffmpeg\\bin\\{binary}.exe")),
        PathBuf::from(format!("C:\\Program Files\\ffmpeg\\bin\\{binary}.exe")),
    ];
    #[cfg(all(unix, not(target_os = "macos")))]
    return vec![
        PathBuf::from(format!("/usr/bin/{binary}")),
        PathBuf::from(format!("/usr/local/bin/{binary}")),
    ];
    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    return vec![];
}

static FFMPEG_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();
static FFPROBE_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Test-only: resettable cache so discovery tests can run in any order
/// without reusing a previous test's resolved path.
#[cfg(feature = "discovery-test-helpers")]
static TEST_FFMPEG_CACHE: parking_lot::Mutex<Option<PathBuf>> = parking_lot::Mutex::new(None);
#[cfg(feature = "discovery-test-helpers")]
static TEST_FFPROBE_CACHE: parking_lot::Mutex<Option<PathBuf>> = parking_lot::Mutex::new(None);

#[cfg(feature = "discovery-test-helpers")]
pub fn __test_reset_path_caches() {
    *TEST_FFMPEG_CACHE.lock() = None;
    *TEST_FFPROBE_CACHE.lock() = None;
}

fn resolve_binary(binary: &str) -> Result<PathBuf, ConfigError> {
    for path in common_paths(binary) {
        if path.exists() {
            log::debug!(
                target: "motion_trim::ffmpeg::discovery",
                "{binary} found in common path: {}",
                path.display()
            );
            return Ok(path);
        }
    }
    if let Some(p) = find_in_path(binary) {
        if p.exists() {
            log::debug!(
                target: "motion_trim::ffmpeg::discovery",
                "{binary} found in PATH: {}",
                p.display()
            );
            return Ok(p);
        }
    }

    log::error!(
        target: "motion_trim::ffmpeg::discovery",
        "{binary} not found in PATH or common locations"
    );
    Err(ConfigError::new(
        binary,
        format!(
            "{binary} not found. Install it on your system:\n  - macOS: brew install ffmpeg\n  - Linux: sudo apt install ffmpeg\n  - Windows: download from https://ffmpeg.org/download.html"
        ),
    ))
}

/// Resolves the `ffmpeg` path, cached for process lifetime.
/// 1. `FFMPEG_PATH` env var (when set and the path exists).
/// 2. Common installation paths (Homebrew, `/usr/bin`, etc.).
/// 3. `PATH` (via `which`/`where`).
pub fn get_ffmpeg_path() -> Result<&'static Path, ConfigError> {
    #[cfg(feature = "discovery-test-helpers")]
    {
        let guard = TEST_FFMPEG_CACHE.lock();
        if let Some(p) = guard.as_ref() {
            return Ok(Box::leak(p.clone().into_boxed_path()));
        }
    }
    if let Some(path) = FFMPEG_PATH_CACHE.get() {
        log::trace!(
            target: "motion_trim::ffmpeg::discovery",
            "ffmpeg path (cached): {}",
            path.display()
        );
        return Ok(path.as_path());
    }
    let path = match std::env::var("FFMPEG_PATH").ok().map(PathBuf::from) {
        Some(p) if p.exists() => {
            log::debug!(
                target: "motion_trim::ffmpeg::discovery",
                "ffmpeg path from FFMPEG_PATH env: {}",
                p.display()
            );
            p
        }
        _ => resolve_binary("ffmpeg")?,
    };
    #[cfg(feature = "discovery-test-helpers")]
    {
        *TEST_FFMPEG_CACHE.lock() = Some(path.clone());
        return Ok(Box::leak(path.into_boxed_path()));
    }
    #[cfg(not(feature = "discovery-test-helpers"))]
    {
        let _ = FFMPEG_PATH_CACHE.set(path);
        Ok(FFMPEG_PATH_CACHE.get().unwrap().as_path())
    }
}

/// Paths to try for `ffprobe` given an `ffmpeg` binary path (suffixed first, then plain).
pub fn ffprobe_candidates(ffmpeg_path: &Path) -> Vec<PathBuf> {
    let parent = match ffmpeg_path.parent() {
        Some(p) => p,
        None => return vec![],
    };
    let mut candidates = Vec::with_capacity(2);
    let stem = ffmpeg_path.file_stem().and_then(|s| s.to_str());
    if let Some(stem) = stem {
        if let Some(suffix) = stem.strip_prefix("ffmpeg") {
            if !suffix.is_empty() {
                #[cfg(target_os = "windows")]
                candidates.push(parent.join(format!("ffprobe{suffix}.exe")));
                #[cfg(not(target_os = "windows"))]
                candidates.push(parent.join(format!("ffprobe{suffix}")));
            }
        }
    }
    #[cfg(target_os = "windows")]
    candidates.push(parent.join("ffprobe.exe"));
    #[cfg(not(target_os = "windows"))]
    candidates.push(parent.join("ffprobe"));
    candidates
}

/// Resolves the `ffprobe` path, cached for process lifetime.
/// Tries `FFPROBE_PATH` env var first, then derives from the resolved
/// `ffmpeg` path (ffmpeg/ffprobe ship together; a platform-suffixed ffmpeg
/// binary such as `ffmpeg-aarch64-apple-darwin` implies a matching ffprobe).
pub fn get_ffprobe_path() -> Result<&'static Path, ConfigError> {
    #[cfg(feature = "discovery-test-helpers")]
    {
        let guard = TEST_FFPROBE_CACHE.lock();
        if let Some(p) = guard.as_ref() {
            return Ok(Box::leak(p.clone().into_boxed_path()));
        }
    }
    if let Some(path) = FFPROBE_PATH_CACHE.get() {
        return Ok(path.as_path());
    }
    if let Some(p) = std::env::var("FFPROBE_PATH").ok().map(PathBuf::from) {
        if p.exists() {
            #[cfg(feature = "discovery-test-helpers")]
            {
                *TEST_FFPROBE_CACHE.lock() = Some(p.clone());
                return Ok(Box::leak(p.into_boxed_path()));
            }
            #[cfg(not(feature = "discovery-test-helpers"))]
            {
                let _ = FFPROBE_PATH_CACHE.set(p);
                return Ok(FFPROBE_PATH_CACHE.get().unwrap().as_path());
            }
        }
    }

    let ffmpeg = get_ffmpeg_path()?;
    let candidates = ffprobe_candidates(ffmpeg);
    for candidate in &candidates {
        if candidate.exists() {
            #[cfg(feature = "discovery-test-helpers")]
            {
                *TEST_FFPROBE_CACHE.lock() = Some(candidate.clone());
                return Ok(Box::leak(candidate.clone().into_boxed_path()));
            }
            #[cfg(not(feature = "discovery-test-helpers"))]
            {
                let _ = FFPROBE_PATH_CACHE.set(candidate.clone());
                return Ok(FFPROBE_PATH_CACHE.get().unwrap().as_path());
            }
        }
    }
    if let Some(p) = find_in_path("ffprobe") {
        if p.exists() {
            #[cfg(feature = "discovery-test-helpers")]
            {
                *TEST_FFPROBE_CACHE.lock() = Some(p.clone());
                return Ok(Box::leak(p.into_boxed_path()));
            }
            #[cfg(not(feature = "discovery-test-helpers"))]
            {
                let _ = FFPROBE_PATH_CACHE.set(p);
                return Ok(FFPROBE_PATH_CACHE.get().unwrap().as_path());
            }
        }
    }

    let expected = candidates
        .last()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("ffprobe near {}", ffmpeg.display()));
    Err(ConfigError::new(
        "ffprobe",
        format!("ffprobe not found at {expected}"),
    ))
}
