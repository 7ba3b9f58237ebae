//! Subject Record - the animal a session was recorded from

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::nwb::Subject;

/// Subject Record describes the recorded animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectRecord {
    animal_id: String,
    datasource_id: u32,
    species: String,
    name: String,
    sex: String,
    date_of_birth: Option<NaiveDate>,
    color: String,
    notes: String,
    strain: String,
    genotype: String,
}

impl SubjectRecord {
    /// Create a builder with the identifying fields.
    #[must_use]
    pub fn builder(animal_id: impl Into<String>, datasource_id: u32) -> SubjectRecordBuilder {
        SubjectRecordBuilder::new(animal_id, datasource_id)
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

    /// Get the species.
    #[must_use]
    pub fn species(&self) -> &str {
        &self.species
    }

    /// Get the animal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the sex.
    #[must_use]
    pub fn sex(&self) -> &str {
        &self.sex
    }

    /// Get the date of birth, if known.
    #[must_use]
    pub const fn date_of_birth(&self) -> Option<NaiveDate> {
        self.date_of_birth
    }

    /// Get the strain.
    #[must_use]
    pub fn strain(&self) -> &str {
        &self.strain
    }

    /// Subject ID scoped to one session: `<animal_id>-<datasource_id>-<session_key>`.
    ///
    /// The session key is interpolated as-is.
    #[must_use]
    pub fn subject_id(&self, session_key: &str) -> String {
        format!("{}-{}-{}", self.animal_id, self.datasource_id, session_key)
    }

    /// Free-text description built from name, color, strain and notes.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "animal_name: {}; color: {}; strain: {}; animal_notes: {}",
            self.name, self.color, self.strain, self.notes
        )
    }

    /// Map to an NWB subject for the given session.
    ///
    /// The date of birth is combined with `reference_time`, since no birth
    /// time of day is recorded.
    #[must_use]
    pub fn to_nwb(&self, session_key: &str, reference_time: NaiveTime) -> Subject {
        Subject {
            subject_id: self.subject_id(session_key),
            description: self.description(),
            genotype: self.genotype.clone(),
            sex: self.sex.clone(),
            species: self.species.clone(),
            date_of_birth: self
                .date_of_birth
                .map(|dob| dob.and_time(reference_time).and_utc()),
        }
    }
}

/// Builder for `SubjectRecord`.
#[derive(Debug)]
pub struct SubjectRecordBuilder {
    record: SubjectRecord,
}

impl SubjectRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(animal_id: impl Into<String>, datasource_id: u32) -> Self {
        Self {
            record: SubjectRecord {
                animal_id: animal_id.into(),
                datasource_id,
                species: String::new(),
                name: String::new(),
                sex: "U".to_string(),
                date_of_birth: None,
                color: "Unknown".to_string(),
                notes: String::new(),
                strain: String::new(),
                genotype: String::new(),
            },
        }
    }

    /// Set species and sex.
    #[must_use]
    pub fn species(mut self, species: impl Into<String>, sex: impl Into<String>) -> Self {
        self.record.species = species.into();
        self.record.sex = sex.into();
        self
    }

    /// Set the animal name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.record.name = name.into();
        self
    }

    /// Set the date of birth.
    #[must_use]
    pub const fn date_of_birth(mut self, dob: NaiveDate) -> Self {
        self.record.date_of_birth = Some(dob);
        self
    }

    /// Set the coat color.
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.record.color = color.into();
        self
    }

    /// Set free-text notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.record.notes = notes.into();
        self
    }

    /// Set strain and genotype.
    #[must_use]
    pub fn strain(mut self, strain: impl Into<String>, genotype: impl Into<String>) -> Self {
        self.record.strain = strain.into();
        self.record.genotype = genotype.into();
        self
    }

    /// Build the `SubjectRecord`.
    #[must_use]
    pub fn build(self) -> SubjectRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_with_empty_key() {
        let record = SubjectRecord::builder("abc123", 0).build();
        assert_eq!(record.subject_id(""), "abc123-0-");
    }

    #[test]
    fn test_description_labels() {
        let record = SubjectRecord::builder("a", 1)
            .name("123")
            .color("Unknown")
            .strain("C +/- x GC+/-", " x ")
            .notes("Sample animal")
            .build();
        assert_eq!(
            record.description(),
            "animal_name: 123; color: Unknown; strain: C +/- x GC+/-; animal_notes: Sample animal"
        );
    }

    #[test]
    fn test_missing_date_of_birth() {
        let record = SubjectRecord::builder("a", 1).build();
        let subject = record.to_nwb("k", NaiveTime::MIN);
        assert!(subject.date_of_birth.is_none());
    }
}
