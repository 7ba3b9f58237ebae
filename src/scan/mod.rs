//! Image-stack readers
//!
//! The exporter only needs two facts from a recording: how many planes were
//! scanned and at what rate. Decoding the pixel data stays out of scope; the
//! raw series points at the original file as external data.

mod scanimage;

pub use scanimage::{ScanImageHeader, ScanImageTiff};

use std::path::{Path, PathBuf};

/// Read-only view of an opened image stack.
pub trait ImageStackReader {
    /// Number of scanning depths in the stack.
    fn num_planes(&self) -> usize;

    /// Acquisition rate in Hz (volume rate for multi-plane stacks).
    fn frame_rate(&self) -> f64;

    /// Path of the underlying file, referenced as external data.
    fn source(&self) -> &Path;
}

/// Reader with fixed values, for tests and dry runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticScan {
    source: PathBuf,
    num_planes: usize,
    frame_rate: f64,
}

impl StaticScan {
    /// Create a reader reporting the given values for `source`.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, num_planes: usize, frame_rate: f64) -> Self {
        Self {
            source: source.into(),
            num_planes,
            frame_rate,
        }
    }
}

impl ImageStackReader for StaticScan {
    fn num_planes(&self) -> usize {
        self.num_planes
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn source(&self) -> &Path {
        &self.source
    }
}

impl<T: ImageStackReader + ?Sized> ImageStackReader for Box<T> {
    fn num_planes(&self) -> usize {
        (**self).num_planes()
    }

    fn frame_rate(&self) -> f64 {
        (**self).frame_rate()
    }

    fn source(&self) -> &Path {
        (**self).source()
    }
}
