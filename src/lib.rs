//! # ophys-nwb-export: Imaging Sessions to Neurodata Without Borders
//!
//! Assembles two-photon imaging sessions into the NWB 2.x container layout:
//! session and subject metadata, one imaging plane and raw acquisition series
//! per optical plane, motion-correction stacks, and optionally ROI
//! segmentations with fluorescence traces.
//!
//! ## Design
//!
//! - Session metadata comes from a [`session::SessionSource`]
//! - Plane count and frame rate come from [`scan::ImageStackReader`]s, paired
//!   with planes by position
//! - Placeholder arrays come from a [`placeholder::PlaceholderSource`]
//! - Serialization goes through an [`nwb::NwbWriter`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ophys_nwb_export::config::ExportConfig;
//! use ophys_nwb_export::export::SessionExporter;
//! use ophys_nwb_export::scan::ScanImageTiff;
//!
//! let scan = "k53_20160530_RSM_125um_41mW_zoom2p2_00001_00001.tif";
//! let mut exporter = SessionExporter::builder(ExportConfig::default())
//!     .reader(ScanImageTiff::open(scan)?)
//!     .reader(ScanImageTiff::open(scan)?)
//!     .build()?;
//!
//! let written = exporter.export_many(&["session-a", "session-b"], "./nwb", true)?;
//! for entry in &written {
//!     println!("{} -> {}", entry.session_key, entry.path.display());
//! }
//! # Ok::<(), ophys_nwb_export::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod export;
pub mod nwb;
pub mod placeholder;
pub mod scan;
pub mod session;

pub use error::{Error, Result};
