//! Unified error type for the motion trim pipeline. Every public entry point
//! returns `Result<_, PipelineError>`; narrower per-stage errors convert into it.

use std::fmt;

/// Why a remote fetch was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadErrorKind {
    Scheme,
    TooManyRedirects,
    Type,
    Size,
    Http,
    Network,
    /// Neither `video_path` nor `video_url` was supplied to the orchestrator.
    NoVideo,
}

impl fmt::Display for DownloadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DownloadErrorKind::Scheme => "scheme",
            DownloadErrorKind::TooManyRedirects => "redirects",
            DownloadErrorKind::Type => "type",
            DownloadErrorKind::Size => "size",
            DownloadErrorKind::Http => "http",
            DownloadErrorKind::Network => "network",
            DownloadErrorKind::NoVideo => "no_video",
        };
        f.write_str(s)
    }
}

/// Error surfaced by the Remote Fetcher (component G).
#[derive(Debug, thiserror::Error)]
#[error("download failed ({kind}): {message}")]
pub struct DownloadError {
    pub kind: DownloadErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
}

impl DownloadError {
    pub fn new(kind: DownloadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16) -> Self {
        Self {
            kind: DownloadErrorKind::Http,
            status_code: Some(status),
            message: format!("server responded {status}"),
        }
    }
}

/// Error surfaced by the Media Probe (component A).
#[derive(Debug, thiserror::Error)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

/// Error surfaced by the Raw Frame Extractor (component B).
#[derive(Debug, thiserror::Error)]
#[error("frame extraction failed: {0}")]
pub struct ExtractionError(pub String);

/// Error surfaced by the Trim Muxer (component F).
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("no segments to mux")]
    EmptyInput,
    #[error("mux failed: {0}")]
    ToolFailed(String),
}

/// Error surfaced by the Storage Sink (component H). Wraps whatever the
/// underlying backend failed with — an `io::Error` for the local disk sink,
/// an `azure_core::Error` for the blob sink — without committing callers to
/// either dependency.
#[derive(Debug, thiserror::Error)]
#[error("storage operation failed: {source}")]
pub struct StorageError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
    pub fn new(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}

/// Error surfaced when configuration or options fall outside accepted ranges.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration for `{field}`: {reason}")]
pub struct ConfigError {
    pub field: String,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The single error type crossing public API boundaries. Callers that only
/// need to distinguish "a 4xx-ish input problem" from "everything else" can
/// match on [`PipelineError::Download`] / [`PipelineError::NoSegments`] and
/// treat the rest uniformly; all variants still carry their source for logs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("no active segments detected")]
    NoSegments,

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Mux(#[from] MuxError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Maps this error onto an HTTP-status-like hint, without pulling in any
    /// particular web framework. `Download` and `NoSegments` are the only
    /// kinds callers are expected to introspect per the error handling design;
    /// everything else collapses to a generic failure.
    pub fn status_hint(&self) -> u16 {
        match self {
            PipelineError::Download(d) => d.status_code.unwrap_or(400),
            PipelineError::NoSegments => 422,
            _ => 500,
        }
    }

    /// True for the two kinds the design says must surface verbatim to callers.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            PipelineError::Download(_) | PipelineError::NoSegments
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_status_hint_uses_carried_code() {
        let err = PipelineError::Download(DownloadError::http(502));
        assert_eq!(err.status_hint(), 502);
        assert!(err.is_caller_visible());
    }

    #[test]
    fn download_status_hint_defaults_to_400_without_code() {
        let err = PipelineError::Download(DownloadError::new(DownloadErrorKind::Scheme, "ftp"));
        assert_eq!(err.status_hint(), 400);
    }

    #[test]
    fn no_segments_hint_is_422() {
        assert_eq!(PipelineError::NoSegments.status_hint(), 422);
        assert!(PipelineError::NoSegments.is_caller_visible());
    }

    #[test]
    fn other_kinds_are_not_caller_visible() {
        let err = PipelineError::Probe(ProbeError("no video stream".into()));
        assert_eq!(err.status_hint(), 500);
        assert!(!err.is_caller_visible());
    }
}
