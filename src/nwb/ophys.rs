//! Optical physiology types
//!
//! Links between objects (series → imaging plane, stack → original series,
//! region → plane segmentation) are stored by name, the way NWB links resolve
//! inside a file. [`NwbFile`](super::NwbFile) checks that every link target
//! exists when the object is added.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{insert_named, Dataset, Named};
use crate::{Error, Result};

/// Optical channel of an imaging plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalChannel {
    /// Channel name
    pub name: String,
    /// Description
    pub description: String,
    /// Emission wavelength (nm)
    pub emission_lambda: f64,
}

/// One optical plane of an imaging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingPlane {
    /// Plane name
    pub name: String,
    /// Description
    pub description: String,
    /// Channel the plane was recorded on
    pub optical_channel: OpticalChannel,
    /// Imaging rate (Hz)
    pub imaging_rate: f64,
    /// Device name
    pub device: String,
    /// Excitation wavelength (nm)
    pub excitation_lambda: f64,
    /// Calcium indicator
    pub indicator: String,
    /// Brain location
    pub location: String,
    /// Pixel spacing
    pub grid_spacing: Vec<f64>,
    /// Unit of `grid_spacing`
    pub grid_spacing_unit: String,
    /// Origin coordinates
    pub origin_coords: Vec<f64>,
    /// Unit of `origin_coords`
    pub origin_coords_unit: String,
}

/// Raw two-photon acquisition stored as external files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoPhotonSeries {
    /// Series name
    pub name: String,
    /// Imaging plane name
    pub imaging_plane: String,
    /// External image files
    pub external_file: Vec<PathBuf>,
    /// First frame index of each external file
    pub starting_frame: Vec<u64>,
    /// Storage format (`external`)
    pub format: String,
    /// Frame dimension
    pub dimension: Vec<usize>,
    /// Start time (s)
    pub starting_time: f64,
    /// Sampling rate (Hz)
    pub rate: f64,
}

/// Image series with in-file data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSeries {
    /// Series name
    pub name: String,
    /// Image data
    pub data: Dataset,
    /// Data unit
    pub unit: String,
    /// Format description
    pub format: String,
    /// Start time (s)
    pub starting_time: f64,
    /// Sampling rate (Hz)
    pub rate: f64,
}

/// Generic regularly sampled time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Series name
    pub name: String,
    /// Samples
    pub data: Dataset,
    /// Data unit
    pub unit: String,
    /// Start time (s)
    pub starting_time: f64,
    /// Sampling rate (Hz)
    pub rate: f64,
}

/// Motion-corrected stack paired with the series it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedImageStack {
    /// Stack name
    pub name: String,
    /// Corrected images; NWB requires the name `corrected`
    pub corrected: ImageSeries,
    /// Name of the original acquisition series
    pub original: String,
    /// Per-frame (x, y) shift; NWB requires the name `xy_translation`
    pub xy_translation: TimeSeries,
}

/// Motion correction results of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionCorrection {
    /// Interface name
    pub name: String,
    corrected_image_stacks: Vec<CorrectedImageStack>,
}

impl Default for MotionCorrection {
    fn default() -> Self {
        Self {
            name: "MotionCorrection".to_string(),
            corrected_image_stacks: Vec::new(),
        }
    }
}

impl MotionCorrection {
    /// Create an empty `MotionCorrection`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a corrected stack.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if a stack with the same name exists.
    pub fn add_corrected_image_stack(&mut self, stack: CorrectedImageStack) -> Result<()> {
        insert_named(&mut self.corrected_image_stacks, stack, &self.name)
    }

    /// All corrected stacks, in insertion order.
    #[must_use]
    pub fn corrected_image_stacks(&self) -> &[CorrectedImageStack] {
        &self.corrected_image_stacks
    }
}

/// One weighted pixel of an ROI mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelMaskPoint {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Weight
    pub weight: f64,
}

/// Weighted pixel list describing one ROI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelMask(Vec<PixelMaskPoint>);

impl PixelMask {
    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the mask has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over pixels.
    pub fn iter(&self) -> std::slice::Iter<'_, PixelMaskPoint> {
        self.0.iter()
    }
}

impl FromIterator<PixelMaskPoint> for PixelMask {
    fn from_iter<I: IntoIterator<Item = PixelMaskPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// ROI table of one imaging plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneSegmentation {
    /// Table name
    pub name: String,
    /// Description
    pub description: String,
    /// Imaging plane name
    pub imaging_plane: String,
    /// Reference series name
    pub reference_images: Option<String>,
    rois: Vec<PixelMask>,
}

impl PlaneSegmentation {
    /// Create an empty segmentation for a plane.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        imaging_plane: impl Into<String>,
        reference_images: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            imaging_plane: imaging_plane.into(),
            reference_images,
            rois: Vec::new(),
        }
    }

    /// Append an ROI and return its row index.
    pub fn add_roi(&mut self, pixel_mask: PixelMask) -> usize {
        self.rois.push(pixel_mask);
        self.rois.len() - 1
    }

    /// Number of ROIs.
    #[must_use]
    pub fn roi_count(&self) -> usize {
        self.rois.len()
    }

    /// ROI mask by row index.
    #[must_use]
    pub fn roi(&self, index: usize) -> Option<&PixelMask> {
        self.rois.get(index)
    }

    /// All ROI masks, in row order.
    #[must_use]
    pub fn rois(&self) -> &[PixelMask] {
        &self.rois
    }

    /// Reference a subset of rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any row index is out of range.
    pub fn create_roi_table_region(
        &self,
        region: Vec<usize>,
        description: impl Into<String>,
    ) -> Result<RoiTableRegion> {
        if let Some(bad) = region.iter().find(|&&row| row >= self.rois.len()) {
            return Err(Error::InvalidInput(format!(
                "ROI row {bad} out of range for {} ({} rows)",
                self.name,
                self.rois.len()
            )));
        }
        Ok(RoiTableRegion {
            table: self.name.clone(),
            description: description.into(),
            region,
        })
    }
}

/// Plane segmentations of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSegmentation {
    /// Interface name
    pub name: String,
    plane_segmentations: Vec<PlaneSegmentation>,
}

impl Default for ImageSegmentation {
    fn default() -> Self {
        Self {
            name: "ImageSegmentation".to_string(),
            plane_segmentations: Vec::new(),
        }
    }
}

impl ImageSegmentation {
    /// Create an empty `ImageSegmentation`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plane segmentation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] on a name collision.
    pub fn add_plane_segmentation(&mut self, segmentation: PlaneSegmentation) -> Result<()> {
        insert_named(&mut self.plane_segmentations, segmentation, &self.name)
    }

    /// Plane segmentation by name.
    #[must_use]
    pub fn plane_segmentation(&self, name: &str) -> Option<&PlaneSegmentation> {
        self.plane_segmentations.iter().find(|ps| ps.name == name)
    }

    /// All plane segmentations, in insertion order.
    #[must_use]
    pub fn plane_segmentations(&self) -> &[PlaneSegmentation] {
        &self.plane_segmentations
    }
}

/// Rows of a plane segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiTableRegion {
    /// Plane segmentation name
    pub table: String,
    /// Description
    pub description: String,
    /// Row indices
    pub region: Vec<usize>,
}

/// Fluorescence traces of a set of ROIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiResponseSeries {
    /// Series name
    pub name: String,
    /// Description
    pub description: String,
    /// Data unit
    pub unit: String,
    /// Trace matrix
    pub data: Dataset,
    /// Sample times
    pub timestamps: Dataset,
    /// ROIs the traces belong to
    pub rois: RoiTableRegion,
}

/// Fluorescence traces of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fluorescence {
    /// Interface name
    pub name: String,
    roi_response_series: Vec<RoiResponseSeries>,
}

impl Default for Fluorescence {
    fn default() -> Self {
        Self {
            name: "Fluorescence".to_string(),
            roi_response_series: Vec::new(),
        }
    }
}

impl Fluorescence {
    /// Create an empty `Fluorescence`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] on a name collision.
    pub fn add_roi_response_series(&mut self, series: RoiResponseSeries) -> Result<()> {
        insert_named(&mut self.roi_response_series, series, &self.name)
    }

    /// All response series, in insertion order.
    #[must_use]
    pub fn roi_response_series(&self) -> &[RoiResponseSeries] {
        &self.roi_response_series
    }
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(
    ImagingPlane,
    TwoPhotonSeries,
    CorrectedImageStack,
    PlaneSegmentation,
    RoiResponseSeries,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(n: u32) -> PixelMask {
        (0..n)
            .map(|i| PixelMaskPoint {
                x: i,
                y: i,
                weight: 0.01,
            })
            .collect()
    }

    #[test]
    fn test_add_roi_returns_row_index() {
        let mut ps = PlaneSegmentation::new("ps", "", "plane", None);
        assert_eq!(ps.add_roi(mask(3)), 0);
        assert_eq!(ps.add_roi(mask(2)), 1);
        assert_eq!(ps.roi_count(), 2);
        assert_eq!(ps.roi(1).map(PixelMask::len), Some(2));
    }

    #[test]
    fn test_region_out_of_range() {
        let mut ps = PlaneSegmentation::new("ps", "", "plane", None);
        ps.add_roi(mask(1));
        assert!(ps.create_roi_table_region(vec![0], "ok").is_ok());
        assert!(matches!(
            ps.create_roi_table_region(vec![0, 1], "bad"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_plane_segmentation() {
        let mut seg = ImageSegmentation::new();
        seg.add_plane_segmentation(PlaneSegmentation::new("ps", "", "p", None))
            .unwrap();
        let result = seg.add_plane_segmentation(PlaneSegmentation::new("ps", "", "p", None));
        assert!(matches!(result, Err(Error::DuplicateName { .. })));
    }
}
