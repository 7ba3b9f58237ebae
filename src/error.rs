//! Error types for the NWB session exporter
//!
//! Every failure is reported to the caller; nothing is swallowed. Skipping an
//! existing output file is not an error and is reported through
//! [`WriteStatus`](crate::export::WriteStatus) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exporter error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input image file does not exist
    #[error("Input not found: {}", path.display())]
    InputNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Input image file exists but could not be decoded
    #[error("Scan read error: {0}")]
    ScanRead(String),

    /// Plane descriptors and image readers are paired positionally
    #[error("Metadata mismatch: {planes} plane descriptor(s) but {readers} image reader(s)\nEvery plane needs exactly one opened reader")]
    MetadataMismatch {
        /// Number of plane descriptors
        planes: usize,
        /// Number of image-stack readers
        readers: usize,
    },

    /// Writer failed while serializing the container graph
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// Output file already exists and overwrite was disabled
    #[error("Output exists: {} (pass overwrite=true to replace it)", path.display())]
    OutputExists {
        /// Existing output path
        path: PathBuf,
    },

    /// Name collision inside an NWB container
    #[error("Duplicate name in {container}: {name}")]
    DuplicateName {
        /// Container that rejected the child
        container: String,
        /// Colliding child name
        name: String,
    },

    /// Link target has not been registered
    #[error("Unknown {kind} reference: {name}")]
    UnknownReference {
        /// Kind of the referenced object (device, imaging plane, ...)
        kind: &'static str,
        /// Name that failed to resolve
        name: String,
    },

    /// Invalid argument or configuration value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
