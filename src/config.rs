//! Validated configuration structs. Coercion of loosely-typed input (e.g.
//! deserialized request bodies) happens here, at the adapter boundary — never
//! inside the detector itself.

use std::env;

use crate::error::ConfigError;

/// Tuning for the motion detector (components C-E). All fields are finite and
/// non-negative by construction; use [`MotionOptions::from_loose`] to coerce
/// untrusted input into this shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOptions {
    pub sample_fps: f64,
    pub threshold: f64,
    pub min_segment_length: f64,
    pub pre_roll: f64,
    pub post_roll: f64,
    pub smoothing_window: usize,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            sample_fps: 2.0,
            threshold: 0.02,
            min_segment_length: 3.0,
            pre_roll: 1.0,
            post_roll: 1.0,
            smoothing_window: 3,
        }
    }
}

/// Coerces a possibly-NaN or possibly-zero value: falls back to `default`
/// when `value` is `NaN` or `0.0`, matching the "parse float, default on
/// NaN-or-zero" rule for untyped option payloads.
fn coerce_or_default(value: f64, default: f64) -> f64 {
    if value.is_nan() || value == 0.0 {
        default
    } else {
        value
    }
}

impl MotionOptions {
    /// Builds options from loosely-typed numeric input (e.g. parsed from an
    /// untyped JSON request), applying the "parse float, default on
    /// NaN-or-zero" coercion rule and rounding/clamping `smoothing_window`
    /// to a positive integer.
    pub fn from_loose(
        sample_fps: f64,
        threshold: f64,
        min_segment_length: f64,
        pre_roll: f64,
        post_roll: f64,
        smoothing_window: f64,
    ) -> Self {
        let defaults = Self::default();
        let smoothing_window = if smoothing_window.is_nan() || smoothing_window == 0.0 {
            defaults.smoothing_window
        } else {
            (smoothing_window.round().max(1.0)) as usize
        };
        Self {
            sample_fps: coerce_or_default(sample_fps, defaults.sample_fps),
            threshold: coerce_or_default(threshold, defaults.threshold),
            min_segment_length: coerce_or_default(min_segment_length, defaults.min_segment_length),
            pre_roll: coerce_or_default(pre_roll, defaults.pre_roll),
            post_roll: coerce_or_default(post_roll, defaults.post_roll),
            smoothing_window,
        }
    }
}

/// Where the Storage Sink should persist artifacts: a local directory, or an
/// Azure Blob Storage container.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Local { uploads_dir: String },
    AzureBlob {
        connection_string: String,
        container: String,
        input_folder: String,
        output_folder: String,
    },
}

/// Process-wide storage configuration, read once from the environment and
/// passed explicitly into a `StorageSink` constructor rather than reached via
/// a module-level singleton.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl StorageConfig {
    /// Reads storage configuration from environment variables (see the
    /// external interfaces for the exact variable names and defaults).
    /// Enables blob mode iff `AZURE_STORAGE_CONNECTION_STRING` is set and
    /// non-empty; validates it contains `AccountName=` and `AccountKey=`,
    /// since those are required to sign URLs later.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("AZURE_STORAGE_CONNECTION_STRING") {
            Ok(connection_string) if !connection_string.trim().is_empty() => {
                if !connection_string.contains("AccountName=")
                    || !connection_string.contains("AccountKey=")
                {
                    return Err(ConfigError::new(
                        "AZURE_STORAGE_CONNECTION_STRING",
                        "must contain AccountName= and AccountKey= to sign URLs",
                    ));
                }
                Ok(Self {
                    backend: StorageBackend::AzureBlob {
                        connection_string,
                        container: env::var("AZURE_STORAGE_CONTAINER")
                            .unwrap_or_else(|_| "volleyball-videos".to_string()),
                        input_folder: env::var("AZURE_STORAGE_INPUT_FOLDER")
                            .unwrap_or_else(|_| "inputs".to_string()),
                        output_folder: env::var("AZURE_STORAGE_OUTPUT_FOLDER")
                            .unwrap_or_else(|_| "processed".to_string()),
                    },
                })
            }
            _ => Ok(Self {
                backend: StorageBackend::Local {
                    uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
                },
            }),
        }
    }
}
