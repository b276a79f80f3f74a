//! Async ffmpeg process spawning shared by the probe, extractor and muxer.
//!
//! Subprocess launches are suspension points (not incidental thread-pool
//! offloads), so this runs the child through `tokio::process::Command`
//! directly rather than blocking a worker thread. stderr is captured into a
//! bounded tail for error diagnostics; no progress percentage is parsed since
//! nothing downstream of the pipeline consumes it.

#[cfg(windows)]
use std::os::windows::process::CommandExt;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use super::discovery::get_ffmpeg_path;
use crate::error::ConfigError;

/// Keep only the last N bytes of stderr to bound memory growth on long runs.
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// Outcome of a failed ffmpeg invocation: the process's exit code (or -1 if
/// it was killed by a signal) and a trimmed stderr capture.
#[derive(Debug, Clone)]
pub struct ToolFailure {
    pub code: i32,
    pub stderr: String,
}

impl ToolFailure {
    /// Last few lines of stderr, for concise logging.
    pub fn stderr_preview(&self, lines: usize) -> String {
        self.stderr
            .lines()
            .rev()
            .take(lines)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Currently running ffmpeg children, tracked so a caller can terminate all
/// in-flight invocations (e.g. on application shutdown).
static ACTIVE_PROCESSES: Mutex<Vec<Arc<Mutex<Option<Child>>>>> = Mutex::new(Vec::new());

fn append_trimmed(buf: &mut Vec<u8>, line: &[u8]) {
    buf.extend_from_slice(line);
    buf.push(b'\n');
    if buf.len() > MAX_STDERR_BYTES {
        let excess = buf.len() - MAX_STDERR_BYTES;
        buf.drain(..excess);
    }
}

/// Runs `ffmpeg` with the given arguments to completion, returning `Ok(())`
/// on exit code 0 and `Err(ToolFailure)` otherwise (tool stderr summary only;
/// no progress is reported back to the caller).
pub async fn run_ffmpeg(args: Vec<String>) -> Result<(), ToolFailure> {
    let ffmpeg_path = get_ffmpeg_path().map_err(|e| ToolFailure {
        code: -1,
        stderr: e.to_string(),
    })?;

    log::debug!(
        target: "motion_trim::ffmpeg::runner",
        "spawning ffmpeg: path={} args={:?}",
        ffmpeg_path.display(),
        args
    );

    let mut cmd = Command::new(ffmpeg_path);
    cmd.args(&args).stdout(Stdio::null()).stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW

    let mut child = cmd.spawn().map_err(|e| ToolFailure {
        code: -1,
        stderr: format!("failed to spawn ffmpeg: {e}"),
    })?;

    let stderr = child.stderr.take().ok_or_else(|| ToolFailure {
        code: -1,
        stderr: "failed to capture ffmpeg stderr".to_string(),
    })?;

    let slot = Arc::new(Mutex::new(Some(child)));
    ACTIVE_PROCESSES.lock().push(Arc::clone(&slot));

    let mut reader = BufReader::new(stderr).split(b'\n');
    let mut stderr_buf = Vec::new();
    while let Ok(Some(line)) = reader.next_segment().await {
        append_trimmed(&mut stderr_buf, &line);
    }

    let taken = slot.lock().take();
    let status = match taken {
        Some(mut c) => c.wait().await.map_err(|e| ToolFailure {
            code: -1,
            stderr: e.to_string(),
        })?,
        None => {
            return Err(ToolFailure {
                code: -1,
                stderr: "ffmpeg process was terminated externally".to_string(),
            });
        }
    };
    ACTIVE_PROCESSES.lock().retain(|s| !Arc::ptr_eq(s, &slot));

    let stderr_str = String::from_utf8_lossy(&stderr_buf).to_string();

    if status.success() {
        log::info!(target: "motion_trim::ffmpeg::runner", "ffmpeg completed successfully");
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        let failure = ToolFailure {
            code,
            stderr: stderr_str,
        };
        log::error!(
            target: "motion_trim::ffmpeg::runner",
            "ffmpeg failed (code={}): {}",
            code,
            failure.stderr_preview(3)
        );
        Err(failure)
    }
}

/// Runs `ffprobe` with the given arguments, returning captured stdout.
pub async fn run_ffprobe_capture(args: Vec<String>) -> Result<String, ToolFailure> {
    let ffprobe_path = super::discovery::get_ffprobe_path().map_err(|e: ConfigError| ToolFailure {
        code: -1,
        stderr: e.to_string(),
    })?;

    let mut cmd = Command::new(ffprobe_path);
    cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(0x08000000);

    let output = cmd.output().await.map_err(|e| ToolFailure {
        code: -1,
        stderr: format!("failed to spawn ffprobe: {e}"),
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(ToolFailure {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Kills every ffmpeg invocation currently tracked as active.
pub fn terminate_all_ffmpeg() {
    let slots: Vec<_> = ACTIVE_PROCESSES.lock().drain(..).collect();
    for slot in slots {
        if let Some(mut child) = slot.lock().take() {
            log::info!(target: "motion_trim::ffmpeg::runner", "terminating ffmpeg process");
            let _ = child.start_kill();
        }
    }
}
