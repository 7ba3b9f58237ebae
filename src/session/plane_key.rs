//! Plane Key - one optical plane of a recording

use serde::{Deserialize, Serialize};

/// Plane Key identifies one optical plane within a dataset.
///
/// NWB object names for the plane are suffixed with `center_plane`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlaneKey {
    /// Owning session
    pub session_name: String,
    /// Recording order within the session
    pub recording_order: u32,
    /// Recording name
    pub recording_name: String,
    /// Dataset name
    pub dataset_name: String,
    /// Center plane index
    pub center_plane: u32,
}

impl PlaneKey {
    /// Name of the imaging plane descriptor.
    #[must_use]
    pub fn imaging_plane_name(&self) -> String {
        format!("ImagingPlane_{}", self.center_plane)
    }

    /// Name of the raw acquisition series.
    #[must_use]
    pub fn series_name(&self) -> String {
        format!("TwoPhotonSeries2_{}", self.center_plane)
    }

    /// Name of the plane segmentation.
    #[must_use]
    pub fn segmentation_name(&self) -> String {
        format!("PlaneSegmentation_{}", self.center_plane)
    }

    /// Name of the raw fluorescence response series.
    #[must_use]
    pub fn response_series_name(&self) -> String {
        format!("RawfluorescenceResponseSeries_{}", self.center_plane)
    }
}
