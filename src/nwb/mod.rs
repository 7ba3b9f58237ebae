//! NWB container model
//!
//! An in-memory graph of the NWB 2.x objects an optical physiology session
//! needs, plus the [`NwbWriter`] seam that turns it into a file.
//!
//! ## Layout
//!
//! ```text
//! NwbFile
//!  ├── subject
//!  ├── devices ─────────────< Device
//!  ├── imaging_planes ──────< ImagingPlane ──> Device
//!  ├── acquisition ─────────< TwoPhotonSeries ──> ImagingPlane
//!  └── processing ──────────< ProcessingModule ("ophys")
//!                                ├── MotionCorrection ──< CorrectedImageStack ──> TwoPhotonSeries
//!                                ├── ImageSegmentation ─< PlaneSegmentation ──> ImagingPlane
//!                                └── Fluorescence ──────< RoiResponseSeries ──> PlaneSegmentation rows
//! ```

mod dataset;
mod file;
pub mod io;
mod ophys;

pub use dataset::Dataset;
pub use file::{DataInterface, Device, NwbFile, NwbFileBuilder, ProcessingModule, Subject};
pub use io::{JsonNwbWriter, NwbWriter, NWB_VERSION};
pub use ophys::{
    CorrectedImageStack, Fluorescence, ImageSegmentation, ImageSeries, ImagingPlane,
    MotionCorrection, OpticalChannel, PixelMask, PixelMaskPoint, PlaneSegmentation,
    RoiResponseSeries, RoiTableRegion, TimeSeries, TwoPhotonSeries,
};

use crate::{Error, Result};

/// Object addressed by name inside its parent container.
pub trait Named {
    /// Object name.
    fn name(&self) -> &str;
}

/// Append `item` unless a sibling already uses its name.
pub(crate) fn insert_named<T: Named>(items: &mut Vec<T>, item: T, container: &str) -> Result<()> {
    if items.iter().any(|existing| existing.name() == item.name()) {
        return Err(Error::DuplicateName {
            container: container.to_string(),
            name: item.name().to_string(),
        });
    }
    items.push(item);
    Ok(())
}
