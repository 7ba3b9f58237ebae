//! Session sources - where session metadata comes from
//!
//! The exporter asks a [`SessionSource`] for everything it knows about a
//! session key. [`SampleSessionSource`] serves the fixed sample recording for
//! every key; [`SessionCatalog`] is an in-memory table keyed by session key,
//! the shape a database-backed source would take.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::{PlaneKey, SessionRecord, SubjectRecord};
use crate::{Error, Result};

/// Provider of session metadata by session key.
pub trait SessionSource {
    /// Session record for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown to the source.
    fn session(&self, session_key: &str) -> Result<SessionRecord>;

    /// Subject the session was recorded from.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown to the source.
    fn subject(&self, session_key: &str) -> Result<SubjectRecord>;

    /// Ordered plane descriptors of the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown to the source.
    fn planes(&self, session_key: &str) -> Result<Vec<PlaneKey>>;
}

/// Fixed sample recording returned for every session key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSessionSource;

impl SampleSessionSource {
    /// Create the sample source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn recorded_at() -> Result<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2022, 3, 1)
            .and_then(|date| date.and_hms_opt(5, 30, 10))
            .ok_or_else(|| Error::InvalidInput("invalid sample timestamp".to_string()))
    }

    fn born_on() -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(2022, 3, 1)
            .ok_or_else(|| Error::InvalidInput("invalid sample date of birth".to_string()))
    }
}

impl SessionSource for SampleSessionSource {
    fn session(&self, _session_key: &str) -> Result<SessionRecord> {
        Ok(SessionRecord::builder(
            "abc123d4fcbb",
            Self::recorded_at()?,
            "123_20220301_ML-100_DJ01_3Openfiled",
        )
        .recording(0, "rrrrd24")
        .animal("abc123", 0, "123")
        .combined(true)
        .equipment_type("2Pminiscope_A")
        .username("testuser")
        .build())
    }

    fn subject(&self, _session_key: &str) -> Result<SubjectRecord> {
        Ok(SubjectRecord::builder("abc123", 0)
            .species("mouse", "M")
            .name("123")
            .date_of_birth(Self::born_on()?)
            .color("Unknown")
            .notes("Sample animal")
            .strain("C +/- x GC+/-", " x ")
            .build())
    }

    fn planes(&self, _session_key: &str) -> Result<Vec<PlaneKey>> {
        Ok((0..2)
            .map(|center_plane| PlaneKey {
                session_name: "abc123d4fcbb".to_string(),
                recording_order: 0,
                recording_name: "rrrrd24".to_string(),
                dataset_name: "dddd280d".to_string(),
                center_plane,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    session: SessionRecord,
    subject: SubjectRecord,
    planes: Vec<PlaneKey>,
}

/// In-memory session table.
#[derive(Debug, Default)]
pub struct SessionCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl SessionCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a session under a key, replacing any previous entry.
    pub fn insert(
        &mut self,
        session_key: impl Into<String>,
        session: SessionRecord,
        subject: SubjectRecord,
        planes: Vec<PlaneKey>,
    ) {
        self.entries.insert(
            session_key.into(),
            CatalogEntry {
                session,
                subject,
                planes,
            },
        );
    }

    fn entry(&self, session_key: &str) -> Result<&CatalogEntry> {
        self.entries
            .get(session_key)
            .ok_or_else(|| Error::UnknownReference {
                kind: "session",
                name: session_key.to_string(),
            })
    }
}

impl SessionSource for SessionCatalog {
    fn session(&self, session_key: &str) -> Result<SessionRecord> {
        Ok(self.entry(session_key)?.session.clone())
    }

    fn subject(&self, session_key: &str) -> Result<SubjectRecord> {
        Ok(self.entry(session_key)?.subject.clone())
    }

    fn planes(&self, session_key: &str) -> Result<Vec<PlaneKey>> {
        Ok(self.entry(session_key)?.planes.clone())
    }
}
