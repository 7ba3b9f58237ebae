//! Exporter configuration
//!
//! File-level metadata, device naming and placeholder shapes, handed to the
//! exporter explicitly. Loadable from TOML; every field has a default.

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::placeholder::PixelMaskSpec;
use crate::{Error, Result};

/// How ROI masks are registered on a plane segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiMaskPolicy {
    /// Every ROI gets the first mask generated for the plane.
    ///
    /// This reproduces a known defect of the sample data pipeline: a fresh
    /// mask is drawn for every cell but only mask 0 is ever registered.
    #[default]
    ReuseFirst,
    /// Every ROI gets the mask generated for its own cell.
    PerCell,
}

/// Sizes of the placeholder arrays attached to each plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderDims {
    /// Shape of the corrected image stack (rows, cols, frames)
    pub corrected_shape: Vec<usize>,
    /// Length of the xy-translation trace
    pub translation_frames: usize,
    /// Number of ROIs registered per plane
    pub roi_count: usize,
    /// Pixel mask shape
    pub mask: PixelMaskSpec,
    /// Frames in the fluorescence matrix (before transpose)
    pub trace_frames: usize,
    /// Columns in the fluorescence matrix (before transpose)
    pub trace_columns: usize,
}

impl Default for PlaceholderDims {
    fn default() -> Self {
        Self {
            corrected_shape: vec![256, 265, 1000],
            translation_frames: 26_100,
            roi_count: 169,
            mask: PixelMaskSpec::default(),
            trace_frames: 26_100,
            trace_columns: 170,
        }
    }
}

impl PlaceholderDims {
    /// Small shapes for tests and dry runs.
    #[must_use]
    pub fn small() -> Self {
        Self {
            corrected_shape: vec![4, 4, 3],
            translation_frames: 10,
            roi_count: 5,
            mask: PixelMaskSpec {
                points: 8,
                ..PixelMaskSpec::default()
            },
            trace_frames: 10,
            trace_columns: 6,
        }
    }
}

/// Exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Institution recorded on every file
    pub institution: String,
    /// Time of day combined with session and birth dates (no precise time is stored)
    pub reference_time: NaiveTime,
    /// Experimenter name
    pub experimenter: String,
    /// Session description
    pub session_description: String,
    /// Experiment description
    pub experiment_description: String,
    /// Related publications
    pub related_publications: String,
    /// File keywords
    pub keywords: Vec<String>,
    /// Acquisition system name, first half of the device name
    pub system_name: String,
    /// Scope name, second half of the device name
    pub scope_name: String,
    /// Optical channel emission wavelength (nm)
    pub emission_lambda: f64,
    /// Imaging plane excitation wavelength (nm)
    pub excitation_lambda: f64,
    /// Calcium indicator
    pub indicator: String,
    /// Dimension recorded on raw acquisition series
    pub series_dimension: Vec<usize>,
    /// Populate ROIs and fluorescence traces
    pub include_rois: bool,
    /// ROI mask registration policy
    pub roi_mask_policy: RoiMaskPolicy,
    /// Placeholder array sizes
    pub placeholders: PlaceholderDims,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            institution: "DataJoint - testing CorrectedImageStack".to_string(),
            reference_time: NaiveTime::MIN,
            experimenter: "Test".to_string(),
            session_description: "Imaging session".to_string(),
            experiment_description: String::new(),
            related_publications: String::new(),
            keywords: vec!["Two-photon imaging".to_string()],
            system_name: "System v1.0".to_string(),
            scope_name: "Scope 1".to_string(),
            emission_lambda: 500.0,
            excitation_lambda: 600.0,
            indicator: "GFP".to_string(),
            series_dimension: vec![100, 100],
            include_rois: false,
            roi_mask_policy: RoiMaskPolicy::default(),
            placeholders: PlaceholderDims::default(),
        }
    }
}

impl ExportConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed, or
    /// [`Error::InvalidInput`] if the result fails [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise the errors of
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Name of the shared acquisition device.
    #[must_use]
    pub fn device_name(&self) -> String {
        format!("{}_{}", self.system_name, self.scope_name)
    }

    /// Reject configurations that would produce empty or unsamplable arrays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let dims = &self.placeholders;
        if dims.corrected_shape.is_empty() || dims.corrected_shape.contains(&0) {
            return Err(Error::InvalidInput(format!(
                "placeholders.corrected_shape must be non-empty with no zero axis, got {:?}",
                dims.corrected_shape
            )));
        }
        if dims
            .corrected_shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .is_none()
        {
            return Err(Error::InvalidInput(format!(
                "placeholders.corrected_shape {:?} has too many elements",
                dims.corrected_shape
            )));
        }
        if dims.translation_frames == 0 {
            return Err(Error::InvalidInput(
                "placeholders.translation_frames must be positive".to_string(),
            ));
        }
        if dims.translation_frames.checked_mul(2).is_none() {
            return Err(Error::InvalidInput(format!(
                "placeholders.translation_frames {} is too large",
                dims.translation_frames
            )));
        }
        if self.include_rois {
            if dims.roi_count == 0 {
                return Err(Error::InvalidInput(
                    "placeholders.roi_count must be positive when ROIs are exported".to_string(),
                ));
            }
            if !dims.mask.is_samplable() {
                return Err(Error::InvalidInput(format!(
                    "placeholders.mask has an empty range: {:?}",
                    dims.mask
                )));
            }
            if dims.trace_frames == 0 || dims.trace_columns == 0 {
                return Err(Error::InvalidInput(
                    "placeholders.trace_frames and trace_columns must be positive".to_string(),
                ));
            }
            if dims.trace_frames.checked_mul(dims.trace_columns).is_none() {
                return Err(Error::InvalidInput(format!(
                    "placeholders trace matrix {} x {} overflows",
                    dims.trace_frames, dims.trace_columns
                )));
            }
        }
        Ok(())
    }
}

/// Builder for `ExportConfig`.
#[derive(Debug, Default)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    /// Set the institution.
    #[must_use]
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.config.institution = institution.into();
        self
    }

    /// Set the reference time of day.
    #[must_use]
    pub const fn reference_time(mut self, time: NaiveTime) -> Self {
        self.config.reference_time = time;
        self
    }

    /// Set the experimenter.
    #[must_use]
    pub fn experimenter(mut self, experimenter: impl Into<String>) -> Self {
        self.config.experimenter = experimenter.into();
        self
    }

    /// Replace the keyword list.
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the ROI and fluorescence stage.
    #[must_use]
    pub const fn include_rois(mut self, include: bool) -> Self {
        self.config.include_rois = include;
        self
    }

    /// Set the ROI mask registration policy.
    #[must_use]
    pub const fn roi_mask_policy(mut self, policy: RoiMaskPolicy) -> Self {
        self.config.roi_mask_policy = policy;
        self
    }

    /// Set the placeholder array sizes.
    #[must_use]
    pub fn placeholders(mut self, dims: PlaceholderDims) -> Self {
        self.config.placeholders = dims;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if validation fails.
    pub fn build(self) -> Result<ExportConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_constants() {
        let config = ExportConfig::default();
        assert_eq!(config.institution, "DataJoint - testing CorrectedImageStack");
        assert_eq!(config.reference_time, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(config.device_name(), "System v1.0_Scope 1");
        assert_eq!(config.placeholders.roi_count, 169);
        assert_eq!(config.roi_mask_policy, RoiMaskPolicy::ReuseFirst);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExportConfig::from_toml_str(
            r#"
            institution = "Lab"
            include_rois = true
            roi_mask_policy = "per_cell"

            [placeholders]
            roi_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.institution, "Lab");
        assert!(config.include_rois);
        assert_eq!(config.roi_mask_policy, RoiMaskPolicy::PerCell);
        assert_eq!(config.placeholders.roi_count, 3);
        assert_eq!(config.placeholders.trace_columns, 170);
        assert_eq!(config.experimenter, "Test");
    }

    #[test]
    fn test_malformed_toml() {
        let result = ExportConfig::from_toml_str("institution = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_rois() {
        let dims = PlaceholderDims {
            roi_count: 0,
            ..PlaceholderDims::small()
        };
        let result = ExportConfig::builder()
            .include_rois(true)
            .placeholders(dims)
            .build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_toml_infinite_mask_weight_rejected() {
        let result = ExportConfig::from_toml_str(
            r#"
            include_rois = true

            [placeholders.mask]
            weight = { start = 0.001, end = inf }
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_toml_nan_mask_weight_rejected() {
        let result = ExportConfig::from_toml_str(
            r#"
            include_rois = true

            [placeholders.mask]
            weight = { start = nan, end = 0.02 }
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_trace_matrix_overflow_rejected() {
        let dims = PlaceholderDims {
            trace_frames: usize::MAX,
            trace_columns: 2,
            ..PlaceholderDims::small()
        };
        let result = ExportConfig::builder()
            .include_rois(true)
            .placeholders(dims)
            .build();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_corrected_shape_overflow_rejected() {
        let dims = PlaceholderDims {
            corrected_shape: vec![usize::MAX, 2, 1],
            ..PlaceholderDims::small()
        };
        assert!(matches!(
            ExportConfig::builder().placeholders(dims).build(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_zero_rois_allowed_without_roi_stage() {
        let dims = PlaceholderDims {
            roi_count: 0,
            ..PlaceholderDims::small()
        };
        assert!(ExportConfig::builder().placeholders(dims).build().is_ok());
    }
}
