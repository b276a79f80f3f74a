//! Motion-based trim pipeline: detects activity in static-camera sports
//! footage via frame differencing, groups active frames into play segments,
//! and drives `ffmpeg` to mux a single output covering only those segments.
//!
//! The public surface is deliberately small: [`config`] for validated
//! options and environment-driven storage configuration, [`storage`] for
//! the pluggable artifact sink, [`motion`] for the detector stages, and
//! [`pipeline::run`] to wire them into a single call. HTTP/function
//! triggers, CLIs, and multipart upload parsing are out of scope — this
//! crate is the engine a thin adapter wraps.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ffmpeg;
pub mod motion;
pub mod pipeline;
pub mod storage;

pub use config::MotionOptions;
pub use error::PipelineError;
pub use motion::TimeRange;
pub use pipeline::{PipelineRequest, PipelineResult, is_valid_output_filename, run};
pub use storage::{StorageSink, StoredVideo};
