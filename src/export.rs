//! Session exporter
//!
//! Assembles one [`NwbFile`] per session key and hands it to an [`NwbWriter`].
//!
//! ## Pipeline
//!
//! ```text
//! SessionSource ──> SessionRecord + SubjectRecord + [PlaneKey]
//!                                                      │ zip (lengths must match)
//! [ImageStackReader] ──────────────────────────────────┘
//!        │
//!        ▼ per plane
//!  ImagingPlane_<n> ─ TwoPhotonSeries2_<n> ─ CorrectedImageStack ─ PlaneSegmentation_<n>
//!                                                  [ROIs + RawfluorescenceResponseSeries_<n>]
//!        │
//!        ▼
//!  ophys: MotionCorrection + ImageSegmentation + Fluorescence ──> NwbWriter
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use ophys_nwb_export::config::ExportConfig;
//! use ophys_nwb_export::export::SessionExporter;
//! use ophys_nwb_export::scan::StaticScan;
//!
//! let mut exporter = SessionExporter::builder(ExportConfig::default())
//!     .reader(StaticScan::new("stack.tif", 1, 30.0))
//!     .reader(StaticScan::new("stack.tif", 1, 30.0))
//!     .build()?;
//!
//! let report = exporter.export_session("session-1", "out", true)?;
//! println!("{}: {:?}", report.path().display(), report.status());
//! # Ok::<(), ophys_nwb_export::Error>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};

use crate::config::{ExportConfig, RoiMaskPolicy};
use crate::nwb::{
    CorrectedImageStack, Dataset, Device, Fluorescence, ImageSegmentation, ImageSeries,
    ImagingPlane, JsonNwbWriter, MotionCorrection, NwbFile, NwbWriter, OpticalChannel, PixelMask,
    PlaneSegmentation, ProcessingModule, RoiResponseSeries, Subject, TimeSeries, TwoPhotonSeries,
};
use crate::placeholder::{PlaceholderSource, RandomPlaceholders};
use crate::scan::ImageStackReader;
use crate::session::{PlaneKey, SampleSessionSource, SessionRecord, SessionSource};
use crate::{Error, Result};

/// Name of the processing module holding all derived data.
pub const OPHYS_MODULE: &str = "ophys";

/// Whether the exporter touched the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// File was (over)written
    Written,
    /// File existed and overwrite was disabled; nothing was written
    SkippedExisting,
}

/// Result of exporting one session.
#[derive(Debug)]
pub struct ExportReport {
    file: NwbFile,
    path: PathBuf,
    status: WriteStatus,
}

impl ExportReport {
    /// In-memory root container.
    #[must_use]
    pub const fn file(&self) -> &NwbFile {
        &self.file
    }

    /// Take the root container.
    #[must_use]
    pub fn into_file(self) -> NwbFile {
        self.file
    }

    /// Output path (written or skipped).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write status.
    #[must_use]
    pub const fn status(&self) -> WriteStatus {
        self.status
    }

    /// Treat a skipped write as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputExists`] if the write was skipped.
    pub fn require_written(self) -> Result<Self> {
        match self.status {
            WriteStatus::Written => Ok(self),
            WriteStatus::SkippedExisting => Err(Error::OutputExists { path: self.path }),
        }
    }
}

/// Outcome of one session in a batch export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Session key
    pub session_key: String,
    /// Output path
    pub path: PathBuf,
    /// Write status
    pub status: WriteStatus,
}

/// Exports imaging sessions to NWB.
pub struct SessionExporter {
    config: ExportConfig,
    source: Box<dyn SessionSource>,
    readers: Vec<Box<dyn ImageStackReader>>,
    placeholders: Box<dyn PlaceholderSource>,
    writer: Box<dyn NwbWriter>,
}

impl std::fmt::Debug for SessionExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExporter")
            .field("config", &self.config)
            .field("readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}

impl SessionExporter {
    /// Create a builder with the given configuration.
    #[must_use]
    pub fn builder(config: ExportConfig) -> SessionExporterBuilder {
        SessionExporterBuilder::new(config)
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Number of opened image-stack readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Build the NWB subject for a session key.
    ///
    /// The key is not validated; it is interpolated into the subject ID as-is.
    ///
    /// # Errors
    ///
    /// Returns the session source's error if the subject cannot be looked up.
    pub fn build_subject(&self, session_key: &str) -> Result<Subject> {
        let record = self.source.subject(session_key)?;
        Ok(record.to_nwb(session_key, self.config.reference_time))
    }

    /// Assemble a session and write it to `<output_dir>/<file_name>.nwb`.
    ///
    /// With `overwrite == false` an existing output file is left untouched and
    /// the report says [`WriteStatus::SkippedExisting`].
    ///
    /// # Errors
    ///
    /// - [`Error::MetadataMismatch`] if the session has a different number of
    ///   planes than there are readers (checked before anything is written)
    /// - [`Error::Io`] if the output directory cannot be created
    /// - [`Error::SerializationFailure`] if the writer fails
    /// - session source and container errors otherwise
    pub fn export_session<P: AsRef<Path>>(
        &mut self,
        session_key: &str,
        output_dir: P,
        overwrite: bool,
    ) -> Result<ExportReport> {
        let span = info_span!("export_session", session_key);
        let _guard = span.enter();
        info!("Exporting to NWB 2.0");

        let session = self.source.session(session_key)?;
        let planes = self.source.planes(session_key)?;
        if planes.len() != self.readers.len() {
            return Err(Error::MetadataMismatch {
                planes: planes.len(),
                readers: self.readers.len(),
            });
        }

        let file = self.assemble(session_key, &session, &planes)?;

        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(session.nwb_file_name());

        let status = if overwrite || !path.exists() {
            self.writer.write(&file, &path)?;
            info!(path = %path.display(), "Write NWB 2.0 file");
            WriteStatus::Written
        } else {
            info!(path = %path.display(), "output exists, skipping write");
            WriteStatus::SkippedExisting
        };

        Ok(ExportReport { file, path, status })
    }

    /// Export sessions one after another. The first failure stops the batch.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`export_session`](Self::export_session);
    /// sessions after it are not attempted.
    pub fn export_many<S, P>(
        &mut self,
        session_keys: &[S],
        output_dir: P,
        overwrite: bool,
    ) -> Result<Vec<BatchEntry>>
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let output_dir = output_dir.as_ref();
        let mut entries = Vec::with_capacity(session_keys.len());
        for key in session_keys {
            let key = key.as_ref();
            let report = self.export_session(key, output_dir, overwrite).map_err(|e| {
                warn!(session_key = key, error = %e, "export failed, aborting batch");
                e
            })?;
            entries.push(BatchEntry {
                session_key: key.to_string(),
                path: report.path,
                status: report.status,
            });
        }
        Ok(entries)
    }

    fn assemble(
        &mut self,
        session_key: &str,
        session: &SessionRecord,
        planes: &[PlaneKey],
    ) -> Result<NwbFile> {
        let config = &self.config;
        let start = session
            .timestamp()
            .date()
            .and_time(config.reference_time)
            .and_utc();

        let mut file = NwbFile::builder(session.file_name(), &config.session_description, start)
            .experimenter(&config.experimenter)
            .institution(&config.institution)
            .experiment_description(&config.experiment_description)
            .related_publications(&config.related_publications)
            .keywords(config.keywords.clone())
            .build();
        file.set_subject(self.build_subject(session_key)?);

        let device = config.device_name();
        file.create_device(Device {
            name: device.clone(),
            description: String::new(),
            manufacturer: String::new(),
        })?;
        let optical_channel = OpticalChannel {
            name: "OpticalChannel".to_string(),
            description: "an optical channel".to_string(),
            emission_lambda: config.emission_lambda,
        };

        let mut assembly = Assembly {
            config,
            file,
            device,
            optical_channel,
            motion_correction: MotionCorrection::new(),
            segmentation: ImageSegmentation::new(),
            fluorescence: Fluorescence::new(),
        };
        for (plane, reader) in planes.iter().zip(&self.readers) {
            assembly.add_plane(plane, reader.as_ref(), self.placeholders.as_mut())?;
        }
        assembly.finish()
    }
}

/// Per-session state while planes are being added.
struct Assembly<'a> {
    config: &'a ExportConfig,
    file: NwbFile,
    device: String,
    optical_channel: OpticalChannel,
    motion_correction: MotionCorrection,
    segmentation: ImageSegmentation,
    fluorescence: Fluorescence,
}

impl Assembly<'_> {
    fn add_plane(
        &mut self,
        plane: &PlaneKey,
        reader: &dyn ImageStackReader,
        placeholders: &mut dyn PlaceholderSource,
    ) -> Result<()> {
        let num_planes = reader.num_planes();
        let frame_rate = reader.frame_rate();
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "reader for {} reports frame rate {frame_rate}; expected a finite positive rate",
                reader.source().display()
            )));
        }
        info!(
            center_plane = plane.center_plane,
            dataset = %plane.dataset_name,
            num_planes,
            frame_rate,
            "adding plane"
        );

        let plane_name = plane.imaging_plane_name();
        self.file.create_imaging_plane(ImagingPlane {
            name: plane_name.clone(),
            description: String::new(),
            optical_channel: self.optical_channel.clone(),
            imaging_rate: frame_rate,
            device: self.device.clone(),
            excitation_lambda: self.config.excitation_lambda,
            indicator: self.config.indicator.clone(),
            location: String::new(),
            grid_spacing: Vec::new(),
            grid_spacing_unit: String::new(),
            origin_coords: Vec::new(),
            origin_coords_unit: String::new(),
        })?;

        let series_name = plane.series_name();
        self.file.add_acquisition(TwoPhotonSeries {
            name: series_name.clone(),
            imaging_plane: plane_name.clone(),
            external_file: vec![reader.source().to_path_buf()],
            starting_frame: vec![0],
            format: "external".to_string(),
            dimension: self.config.series_dimension.clone(),
            starting_time: 0.0,
            rate: 1.0,
        })?;

        let dims = &self.config.placeholders;
        self.motion_correction
            .add_corrected_image_stack(CorrectedImageStack {
                name: series_name.clone(),
                corrected: ImageSeries {
                    name: "corrected".to_string(),
                    data: Dataset::ones(dims.corrected_shape.clone()),
                    unit: "na".to_string(),
                    format: "Average projection of motion corrected stack - contrast enhanced (unwarped)"
                        .to_string(),
                    starting_time: 0.0,
                    rate: 1.0,
                },
                original: series_name.clone(),
                xy_translation: TimeSeries {
                    name: "xy_translation".to_string(),
                    data: Dataset::ones(vec![dims.translation_frames, 2]),
                    unit: "pixels".to_string(),
                    starting_time: 0.0,
                    rate: 1.0,
                },
            })?;

        let mut segmentation = PlaneSegmentation::new(
            plane.segmentation_name(),
            "output from segmenting the imaging plane",
            plane_name,
            Some(series_name),
        );

        if self.config.include_rois {
            self.add_rois(&mut segmentation, placeholders);

            let data = placeholders
                .uniform_matrix(dims.trace_frames, dims.trace_columns)
                .transposed()?;
            let timestamps = placeholders
                .uniform_matrix(dims.trace_frames, dims.trace_columns)
                .transposed()?;
            let rois = segmentation
                .create_roi_table_region((0..segmentation.roi_count()).collect(), "list of ROIs")?;

            self.fluorescence.add_roi_response_series(RoiResponseSeries {
                name: plane.response_series_name(),
                description: "Raw fluorescence trace".to_string(),
                unit: "a.u.".to_string(),
                data,
                timestamps,
                rois,
            })?;
        }

        self.segmentation.add_plane_segmentation(segmentation)
    }

    fn add_rois(&self, segmentation: &mut PlaneSegmentation, placeholders: &mut dyn PlaceholderSource) {
        let dims = &self.config.placeholders;
        let mut first: Option<PixelMask> = None;
        // A mask is drawn for every cell under both policies.
        for _cell in 1..=dims.roi_count {
            let mask = placeholders.pixel_mask(&dims.mask);
            let registered = match self.config.roi_mask_policy {
                RoiMaskPolicy::PerCell => mask,
                RoiMaskPolicy::ReuseFirst => first.get_or_insert(mask).clone(),
            };
            segmentation.add_roi(registered);
        }
    }

    fn finish(self) -> Result<NwbFile> {
        let mut file = self.file;
        let mut module = ProcessingModule::new(OPHYS_MODULE, "optical physiology processed data");
        module.add(self.motion_correction)?;
        module.add(self.segmentation)?;
        module.add(self.fluorescence)?;
        file.add_processing_module(module)?;
        Ok(file)
    }
}

/// Builder for `SessionExporter`.
pub struct SessionExporterBuilder {
    config: ExportConfig,
    source: Box<dyn SessionSource>,
    readers: Vec<Box<dyn ImageStackReader>>,
    placeholders: Option<Box<dyn PlaceholderSource>>,
    writer: Box<dyn NwbWriter>,
}

impl SessionExporterBuilder {
    /// Create a builder with the sample session source and JSON writer.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            source: Box::new(SampleSessionSource::new()),
            readers: Vec::new(),
            placeholders: None,
            writer: Box::new(JsonNwbWriter::new()),
        }
    }

    /// Set the session source.
    #[must_use]
    pub fn source(mut self, source: impl SessionSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Append one image-stack reader. Readers pair with planes by position.
    #[must_use]
    pub fn reader(mut self, reader: impl ImageStackReader + 'static) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    /// Append several readers.
    #[must_use]
    pub fn readers<I>(mut self, readers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ImageStackReader>>,
    {
        self.readers.extend(readers);
        self
    }

    /// Set the placeholder data source (defaults to an entropy-seeded RNG).
    #[must_use]
    pub fn placeholders(mut self, placeholders: impl PlaceholderSource + 'static) -> Self {
        self.placeholders = Some(Box::new(placeholders));
        self
    }

    /// Set the writer.
    #[must_use]
    pub fn writer(mut self, writer: impl NwbWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    /// Build the exporter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid.
    pub fn build(self) -> Result<SessionExporter> {
        self.config.validate()?;
        Ok(SessionExporter {
            config: self.config,
            source: self.source,
            readers: self.readers,
            placeholders: self
                .placeholders
                .unwrap_or_else(|| Box::new(RandomPlaceholders::from_entropy())),
            writer: self.writer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaceholderDims;
    use crate::scan::StaticScan;

    fn exporter(readers: usize, include_rois: bool) -> SessionExporter {
        let config = ExportConfig::builder()
            .include_rois(include_rois)
            .placeholders(PlaceholderDims::small())
            .build()
            .unwrap();
        let mut builder = SessionExporter::builder(config).placeholders(RandomPlaceholders::seeded(3));
        for _ in 0..readers {
            builder = builder.reader(StaticScan::new("stack.tif", 1, 30.0));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_build_subject_formats_id() {
        let exporter = exporter(2, false);
        let subject = exporter.build_subject("key-7").unwrap();
        assert_eq!(subject.subject_id, "abc123-0-key-7");
        assert_eq!(subject.genotype, " x ");
        assert_eq!(
            subject.date_of_birth.map(|d| d.to_rfc3339()),
            Some("2022-03-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_assemble_without_rois() {
        let mut exporter = exporter(2, false);
        let session = exporter.source.session("k").unwrap();
        let planes = exporter.source.planes("k").unwrap();
        let file = exporter.assemble("k", &session, &planes).unwrap();

        let ophys = file.processing_module(OPHYS_MODULE).unwrap();
        assert_eq!(ophys.motion_correction().unwrap().corrected_image_stacks().len(), 2);
        assert!(ophys.fluorescence().unwrap().roi_response_series().is_empty());
        let seg = ophys.image_segmentation().unwrap();
        assert!(seg.plane_segmentations().iter().all(|ps| ps.roi_count() == 0));
    }

    #[test]
    fn test_reuse_first_registers_identical_masks() {
        let mut exporter = exporter(2, true);
        let session = exporter.source.session("k").unwrap();
        let planes = exporter.source.planes("k").unwrap();
        let file = exporter.assemble("k", &session, &planes).unwrap();

        let seg = file
            .processing_module(OPHYS_MODULE)
            .and_then(ProcessingModule::image_segmentation)
            .unwrap();
        let ps = seg.plane_segmentation("PlaneSegmentation_0").unwrap();
        assert_eq!(ps.roi_count(), 5);
        assert!(ps.rois().iter().all(|m| m == &ps.rois()[0]));
    }

    #[test]
    fn test_start_time_uses_reference_time() {
        let mut exporter = exporter(2, false);
        let session = exporter.source.session("k").unwrap();
        let planes = exporter.source.planes("k").unwrap();
        let file = exporter.assemble("k", &session, &planes).unwrap();
        assert_eq!(
            file.session_start_time().to_rfc3339(),
            "2022-03-01T00:00:00+00:00"
        );
    }
}
