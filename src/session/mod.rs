//! Session metadata
//!
//! Records describing what was recorded, and the [`SessionSource`] capability
//! the exporter uses to look them up.
//!
//! ## Schema Overview
//!
//! ```text
//! SessionRecord (1) ──< PlaneKey (N)
//!       │
//!       └── SubjectRecord (1)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ophys_nwb_export::session::{SampleSessionSource, SessionSource};
//!
//! let source = SampleSessionSource::new();
//! let session = source.session("any-key")?;
//! assert!(session.nwb_file_name().ends_with(".nwb"));
//!
//! let subject = source.subject("any-key")?;
//! assert_eq!(subject.subject_id("any-key"), "abc123-0-any-key");
//! # Ok::<(), ophys_nwb_export::Error>(())
//! ```

mod plane_key;
mod session_record;
mod source;
mod subject_record;

pub use plane_key::PlaneKey;
pub use session_record::{SessionRecord, SessionRecordBuilder};
pub use source::{SampleSessionSource, SessionCatalog, SessionSource};
pub use subject_record::{SubjectRecord, SubjectRecordBuilder};
