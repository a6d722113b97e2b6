//! Error taxonomy
//!
//! Startup errors (`ModelLoad`, `SchemaMismatch`, `Config`) are fatal and
//! abort with a diagnostic. Steady-state errors are isolated per packet
//! (`MalformedPacket`) or retried then surfaced (`SinkWrite`); neither may
//! kill the detection loop on a single occurrence.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentryError {
    /// Extractor output width disagrees with the classifier's declared
    /// input width. Raised at engine construction, never at runtime.
    #[error("feature schema mismatch: extractor produces {extractor} values, model expects {model}")]
    SchemaMismatch { extractor: usize, model: usize },

    /// A single packet could not be scored; the stream continues.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Durable append failed after bounded retries.
    #[error("detection log write failed after {attempts} attempts: {source}")]
    SinkWrite {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// The writer task is no longer accepting records. The exit reason
    /// itself is reported when the sink is closed.
    #[error("detection sink unavailable: {0}")]
    SinkClosed(String),

    /// Classifier artifact could not be loaded. Fatal at startup.
    #[error("failed to load classifier artifact {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SentryError>;
