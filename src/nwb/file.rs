//! Root file container

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ophys::{Fluorescence, ImageSegmentation, ImagingPlane, MotionCorrection, TwoPhotonSeries};
use super::{insert_named, Named};
use crate::{Error, Result};

/// Subject metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject ID
    pub subject_id: String,
    /// Free-text description
    pub description: String,
    /// Genotype
    pub genotype: String,
    /// Sex
    pub sex: String,
    /// Species
    pub species: String,
    /// Date of birth
    pub date_of_birth: Option<DateTime<Utc>>,
}

/// Acquisition device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device name
    pub name: String,
    /// Description
    pub description: String,
    /// Manufacturer
    pub manufacturer: String,
}

/// Data interface held by a processing module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "neurodata_type")]
pub enum DataInterface {
    /// Motion correction results
    MotionCorrection(MotionCorrection),
    /// ROI segmentation
    ImageSegmentation(ImageSegmentation),
    /// Fluorescence traces
    Fluorescence(Fluorescence),
}

impl Named for DataInterface {
    fn name(&self) -> &str {
        match self {
            Self::MotionCorrection(mc) => &mc.name,
            Self::ImageSegmentation(seg) => &seg.name,
            Self::Fluorescence(fl) => &fl.name,
        }
    }
}

impl From<MotionCorrection> for DataInterface {
    fn from(value: MotionCorrection) -> Self {
        Self::MotionCorrection(value)
    }
}

impl From<ImageSegmentation> for DataInterface {
    fn from(value: ImageSegmentation) -> Self {
        Self::ImageSegmentation(value)
    }
}

impl From<Fluorescence> for DataInterface {
    fn from(value: Fluorescence) -> Self {
        Self::Fluorescence(value)
    }
}

/// Group of processed data interfaces, e.g. `ophys`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingModule {
    /// Module name
    pub name: String,
    /// Description
    pub description: String,
    interfaces: Vec<DataInterface>,
}

impl ProcessingModule {
    /// Create an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            interfaces: Vec::new(),
        }
    }

    /// Add a data interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if an interface with the same name exists.
    pub fn add(&mut self, interface: impl Into<DataInterface>) -> Result<()> {
        insert_named(&mut self.interfaces, interface.into(), &self.name)
    }

    /// All interfaces, in insertion order.
    #[must_use]
    pub fn interfaces(&self) -> &[DataInterface] {
        &self.interfaces
    }

    /// First `MotionCorrection` interface.
    #[must_use]
    pub fn motion_correction(&self) -> Option<&MotionCorrection> {
        self.interfaces.iter().find_map(|i| match i {
            DataInterface::MotionCorrection(mc) => Some(mc),
            _ => None,
        })
    }

    /// First `ImageSegmentation` interface.
    #[must_use]
    pub fn image_segmentation(&self) -> Option<&ImageSegmentation> {
        self.interfaces.iter().find_map(|i| match i {
            DataInterface::ImageSegmentation(seg) => Some(seg),
            _ => None,
        })
    }

    /// First `Fluorescence` interface.
    #[must_use]
    pub fn fluorescence(&self) -> Option<&Fluorescence> {
        self.interfaces.iter().find_map(|i| match i {
            DataInterface::Fluorescence(fl) => Some(fl),
            _ => None,
        })
    }

    fn segmentation_rows(&self, table: &str) -> Option<usize> {
        self.interfaces.iter().find_map(|i| match i {
            DataInterface::ImageSegmentation(seg) => {
                seg.plane_segmentation(table).map(|ps| ps.roi_count())
            }
            _ => None,
        })
    }
}

impl Named for ProcessingModule {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Device {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Root NWB container of one session.
///
/// Children are added through `add_*` methods that enforce unique names and
/// resolve links against what is already registered, so objects must be added
/// in dependency order: device, imaging plane, acquisition, processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NwbFile {
    identifier: String,
    session_description: String,
    session_start_time: DateTime<Utc>,
    file_create_date: DateTime<Utc>,
    experimenter: String,
    institution: String,
    experiment_description: String,
    related_publications: String,
    keywords: Vec<String>,
    subject: Option<Subject>,
    devices: Vec<Device>,
    imaging_planes: Vec<ImagingPlane>,
    acquisition: Vec<TwoPhotonSeries>,
    processing: Vec<ProcessingModule>,
}

impl NwbFile {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn builder(
        identifier: impl Into<String>,
        session_description: impl Into<String>,
        session_start_time: DateTime<Utc>,
    ) -> NwbFileBuilder {
        NwbFileBuilder::new(identifier, session_description, session_start_time)
    }

    /// Get the file identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the session description.
    #[must_use]
    pub fn session_description(&self) -> &str {
        &self.session_description
    }

    /// Get the session start time.
    #[must_use]
    pub const fn session_start_time(&self) -> DateTime<Utc> {
        self.session_start_time
    }

    /// Get the file creation date.
    #[must_use]
    pub const fn file_create_date(&self) -> DateTime<Utc> {
        self.file_create_date
    }

    /// Get the experimenter.
    #[must_use]
    pub fn experimenter(&self) -> &str {
        &self.experimenter
    }

    /// Get the institution.
    #[must_use]
    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// Get the experiment description.
    #[must_use]
    pub fn experiment_description(&self) -> &str {
        &self.experiment_description
    }

    /// Get the related publications.
    #[must_use]
    pub fn related_publications(&self) -> &str {
        &self.related_publications
    }

    /// Get the keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Get the subject, if set.
    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Attach the subject, replacing any previous one.
    pub fn set_subject(&mut self, subject: Subject) {
        self.subject = Some(subject);
    }

    /// Register a device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] on a name collision.
    pub fn create_device(&mut self, device: Device) -> Result<()> {
        insert_named(&mut self.devices, device, "devices")
    }

    /// All devices.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Register an imaging plane. Its device must already be registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownReference`] for an unregistered device and
    /// [`Error::DuplicateName`] on a name collision.
    pub fn create_imaging_plane(&mut self, plane: ImagingPlane) -> Result<()> {
        if !self.devices.iter().any(|d| d.name == plane.device) {
            return Err(Error::UnknownReference {
                kind: "device",
                name: plane.device,
            });
        }
        insert_named(&mut self.imaging_planes, plane, "imaging_planes")
    }

    /// All imaging planes, in insertion order.
    #[must_use]
    pub fn imaging_planes(&self) -> &[ImagingPlane] {
        &self.imaging_planes
    }

    /// Imaging plane by name.
    #[must_use]
    pub fn imaging_plane(&self, name: &str) -> Option<&ImagingPlane> {
        self.imaging_planes.iter().find(|p| p.name == name)
    }

    /// Add a raw acquisition series. Its imaging plane must already be registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownReference`] for an unregistered imaging plane
    /// and [`Error::DuplicateName`] on a name collision.
    pub fn add_acquisition(&mut self, series: TwoPhotonSeries) -> Result<()> {
        if self.imaging_plane(&series.imaging_plane).is_none() {
            return Err(Error::UnknownReference {
                kind: "imaging plane",
                name: series.imaging_plane,
            });
        }
        insert_named(&mut self.acquisition, series, "acquisition")
    }

    /// All acquisition series, in insertion order.
    #[must_use]
    pub fn acquisition(&self) -> &[TwoPhotonSeries] {
        &self.acquisition
    }

    /// Acquisition series by name.
    #[must_use]
    pub fn acquisition_series(&self, name: &str) -> Option<&TwoPhotonSeries> {
        self.acquisition.iter().find(|s| s.name == name)
    }

    /// Attach a processing module after resolving every link it holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownReference`] if a corrected stack, plane
    /// segmentation or ROI region points at something not in the file,
    /// [`Error::InvalidInput`] if a region addresses missing rows, and
    /// [`Error::DuplicateName`] on a name collision.
    pub fn add_processing_module(&mut self, module: ProcessingModule) -> Result<()> {
        for interface in module.interfaces() {
            match interface {
                DataInterface::MotionCorrection(mc) => {
                    for stack in mc.corrected_image_stacks() {
                        self.require_series(&stack.original)?;
                    }
                }
                DataInterface::ImageSegmentation(seg) => {
                    for ps in seg.plane_segmentations() {
                        if self.imaging_plane(&ps.imaging_plane).is_none() {
                            return Err(Error::UnknownReference {
                                kind: "imaging plane",
                                name: ps.imaging_plane.clone(),
                            });
                        }
                        if let Some(reference) = &ps.reference_images {
                            self.require_series(reference)?;
                        }
                    }
                }
                DataInterface::Fluorescence(fl) => {
                    for series in fl.roi_response_series() {
                        let rows = std::iter::once(&module)
                            .chain(&self.processing)
                            .find_map(|m| m.segmentation_rows(&series.rois.table))
                            .ok_or_else(|| Error::UnknownReference {
                                kind: "plane segmentation",
                                name: series.rois.table.clone(),
                            })?;
                        if series.rois.region.iter().any(|&row| row >= rows) {
                            return Err(Error::InvalidInput(format!(
                                "{} addresses rows beyond {} ({rows} rows)",
                                series.name, series.rois.table
                            )));
                        }
                    }
                }
            }
        }
        insert_named(&mut self.processing, module, "processing")
    }

    /// All processing modules.
    #[must_use]
    pub fn processing(&self) -> &[ProcessingModule] {
        &self.processing
    }

    /// Processing module by name.
    #[must_use]
    pub fn processing_module(&self, name: &str) -> Option<&ProcessingModule> {
        self.processing.iter().find(|m| m.name == name)
    }

    fn require_series(&self, name: &str) -> Result<()> {
        if self.acquisition_series(name).is_none() {
            return Err(Error::UnknownReference {
                kind: "acquisition series",
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `NwbFile`.
#[derive(Debug)]
pub struct NwbFileBuilder {
    file: NwbFile,
}

impl NwbFileBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        session_description: impl Into<String>,
        session_start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            file: NwbFile {
                identifier: identifier.into(),
                session_description: session_description.into(),
                session_start_time,
                file_create_date: Utc::now(),
                experimenter: String::new(),
                institution: String::new(),
                experiment_description: String::new(),
                related_publications: String::new(),
                keywords: Vec::new(),
                subject: None,
                devices: Vec::new(),
                imaging_planes: Vec::new(),
                acquisition: Vec::new(),
                processing: Vec::new(),
            },
        }
    }

    /// Set a custom file creation date (useful for testing).
    #[must_use]
    pub const fn file_create_date(mut self, date: DateTime<Utc>) -> Self {
        self.file.file_create_date = date;
        self
    }

    /// Set the experimenter.
    #[must_use]
    pub fn experimenter(mut self, experimenter: impl Into<String>) -> Self {
        self.file.experimenter = experimenter.into();
        self
    }

    /// Set the institution.
    #[must_use]
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.file.institution = institution.into();
        self
    }

    /// Set the experiment description.
    #[must_use]
    pub fn experiment_description(mut self, description: impl Into<String>) -> Self {
        self.file.experiment_description = description.into();
        self
    }

    /// Set the related publications.
    #[must_use]
    pub fn related_publications(mut self, publications: impl Into<String>) -> Self {
        self.file.related_publications = publications.into();
        self
    }

    /// Set the keywords.
    #[must_use]
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.file.keywords = keywords;
        self
    }

    /// Build the `NwbFile`.
    #[must_use]
    pub fn build(self) -> NwbFile {
        self.file
    }
}
