//! Session Record - identity of one imaging session

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Session Record identifies one recorded imaging session.
///
/// Immutable once built. The derived [`file_name`](Self::file_name) doubles as
/// the NWB file identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    session_name: String,
    recording_order: u32,
    recording_name: String,
    animal_id: String,
    datasource_id: u32,
    animal_name: String,
    timestamp: NaiveDateTime,
    combined: bool,
    timeseries_name: String,
    equipment_type: String,
    username: String,
}

impl SessionRecord {
    /// Create a builder with the required identifying fields.
    #[must_use]
    pub fn builder(
        session_name: impl Into<String>,
        timestamp: NaiveDateTime,
        timeseries_name: impl Into<String>,
    ) -> SessionRecordBuilder {
        SessionRecordBuilder::new(session_name, timestamp, timeseries_name)
    }

    /// Get the session name.
    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Get the recording order.
    #[must_use]
    pub const fn recording_order(&self) -> u32 {
        self.recording_order
    }

    /// Get the recording name.
    #[must_use]
    pub fn recording_name(&self) -> &str {
        &self.recording_name
    }

    /// Get the animal ID.
    #[must_use]
    pub fn animal_id(&self) -> &str {
        &self.animal_id
    }

    /// Get the datasource ID.
    #[must_use]
    pub const fn datasource_id(&self) -> u32 {
        self.datasource_id
    }

    /// Get the animal name.
    #[must_use]
    pub fn animal_name(&self) -> &str {
        &self.animal_name
    }

    /// Get the recording timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Whether the recording was combined from several acquisitions.
    #[must_use]
    pub const fn combined(&self) -> bool {
        self.combined
    }

    /// Get the timeseries name.
    #[must_use]
    pub fn timeseries_name(&self) -> &str {
        &self.timeseries_name
    }

    /// Get the equipment type.
    #[must_use]
    pub fn equipment_type(&self) -> &str {
        &self.equipment_type
    }

    /// Get the username that registered the session.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// File name without extension: `<session_name>_<YYYY-MM-DD>_<timeseries_name>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.session_name,
            self.timestamp.format("%Y-%m-%d"),
            self.timeseries_name
        )
    }

    /// Output file name with the `.nwb` extension.
    #[must_use]
    pub fn nwb_file_name(&self) -> String {
        format!("{}.nwb", self.file_name())
    }
}

/// Builder for `SessionRecord`.
#[derive(Debug)]
pub struct SessionRecordBuilder {
    record: SessionRecord,
}

impl SessionRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        session_name: impl Into<String>,
        timestamp: NaiveDateTime,
        timeseries_name: impl Into<String>,
    ) -> Self {
        Self {
            record: SessionRecord {
                session_name: session_name.into(),
                recording_order: 0,
                recording_name: String::new(),
                animal_id: String::new(),
                datasource_id: 0,
                animal_name: String::new(),
                timestamp,
                combined: false,
                timeseries_name: timeseries_name.into(),
                equipment_type: String::new(),
                username: String::new(),
            },
        }
    }

    /// Set the recording order and name.
    #[must_use]
    pub fn recording(mut self, order: u32, name: impl Into<String>) -> Self {
        self.record.recording_order = order;
        self.record.recording_name = name.into();
        self
    }

    /// Set the animal identity.
    #[must_use]
    pub fn animal(
        mut self,
        animal_id: impl Into<String>,
        datasource_id: u32,
        animal_name: impl Into<String>,
    ) -> Self {
        self.record.animal_id = animal_id.into();
        self.record.datasource_id = datasource_id;
        self.record.animal_name = animal_name.into();
        self
    }

    /// Mark the recording as combined.
    #[must_use]
    pub const fn combined(mut self, combined: bool) -> Self {
        self.record.combined = combined;
        self
    }

    /// Set the equipment type.
    #[must_use]
    pub fn equipment_type(mut self, equipment_type: impl Into<String>) -> Self {
        self.record.equipment_type = equipment_type.into();
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.record.username = username.into();
        self
    }

    /// Build the `SessionRecord`.
    #[must_use]
    pub fn build(self) -> SessionRecord {
        self.record
    }
}
