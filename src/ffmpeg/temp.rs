//! Scratch file naming for ffmpeg-driven stages. Pairs with [`crate::cleanup::TempCleanup`]
//! for the scoped-deletion half of the lifecycle.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const TEMP_FILE_PREFIX: &str = "motion-trim-";

/// Stateless factory for creating uniquely-named temp files under the OS temp dir.
pub struct TempFileManager;

impl Default for TempFileManager {
    fn default() -> Self {
        Self
    }
}

fn random_alphanumeric_suffix(len: usize) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    static STATE: AtomicU64 = AtomicU64::new(0);
    let mut s = String::with_capacity(len);
    for _ in 0..len {
        let idx = STATE.fetch_add(1, Ordering::Relaxed) as usize % CHARS.len();
        s.push(CHARS[idx] as char);
    }
    s
}

impl TempFileManager {
    pub fn create(&self, suffix: &str, content: Option<&[u8]>) -> io::Result<PathBuf> {
        let tmp = std::env::temp_dir();
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_millis();
        let name = format!(
            "{TEMP_FILE_PREFIX}{timestamp_ms}-{}-{suffix}",
            random_alphanumeric_suffix(9)
        );
        let path = tmp.join(name);
        if let Some(data) = content {
            fs::write(&path, data)?;
        }
        log::debug!(
            target: "motion_trim::ffmpeg::temp",
            "TempFileManager::create: suffix={suffix}, path={}",
            path.display()
        );
        Ok(path)
    }
}

fn parse_timestamp_from_name(name: &str) -> Option<u128> {
    let rest = name.strip_prefix(TEMP_FILE_PREFIX)?;
    let ts = rest.split('-').next()?;
    ts.parse::<u128>().ok()
}

/// Best-effort cleanup of temp files left behind by crashed or killed
/// invocations. Deletes files matching `motion-trim-{timestamp}-...` older
/// than `max_age`.
pub fn cleanup_old_temp_files(max_age: Duration) {
    let tmp = std::env::temp_dir();
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let max_age_ms = max_age.as_millis();

    let entries = match fs::read_dir(&tmp) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!(
                target: "motion_trim::ffmpeg::temp",
                "cleanup_old_temp_files: failed to read temp dir {}: {e}",
                tmp.display()
            );
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(ts_ms) = parse_timestamp_from_name(file_name) else {
            continue;
        };
        let age_ms = now_ms.saturating_sub(ts_ms);
        if age_ms > max_age_ms {
            log::trace!(
                target: "motion_trim::ffmpeg::temp",
                "cleanup_old_temp_files: removing stale temp file {} (age_ms={age_ms})",
                path.display()
            );
            let _ = fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_returns_path_under_temp_dir_with_suffix() {
        let manager = TempFileManager::default();
        let path = manager.create("suffix.raw", None).unwrap();
        let tmp = std::env::temp_dir();
        assert!(path.starts_with(&tmp));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with("suffix.raw")
        );
        assert!(!path.exists(), "create(_, None) should not create a file");
    }

    #[test]
    fn create_with_content_writes_file() {
        let manager = TempFileManager::default();
        let data = b"raw frame bytes";
        let path = manager.create("test.raw", Some(data)).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), data);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn create_yields_different_paths() {
        let manager = TempFileManager::default();
        let path1 = manager.create("x", None).unwrap();
        let path2 = manager.create("x", None).unwrap();
        assert_ne!(path1, path2);
    }

    #[test]
    fn parse_timestamp_from_name_round_trips() {
        let name = "motion-trim-1700000000000-abc123xyz-test.raw";
        assert_eq!(parse_timestamp_from_name(name), Some(1_700_000_000_000));
    }

    #[test]
    fn parse_timestamp_from_name_rejects_foreign_files() {
        assert_eq!(parse_timestamp_from_name("not-ours.tmp"), None);
    }
}
