//! Batch and user directory collaborators.
//!
//! The core never owns cohort membership or student identity; it asks these traits. The
//! [`StudentDirectory`] implementation answers both from an in-process table, typically loaded
//! from a CSV export with the columns `batch_id,student_id,display_name,email`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{BatchId, StudentId};

/// Resolves which students belong to a batch.
pub trait BatchDirectory: Send + Sync {
    fn students_in_batch(&self, batch_id: &BatchId) -> Result<Vec<StudentId>, DirectoryError>;

    fn is_in_batch(
        &self,
        batch_id: &BatchId,
        student_id: &StudentId,
    ) -> Result<bool, DirectoryError> {
        Ok(self.students_in_batch(batch_id)?.contains(student_id))
    }
}

/// Resolves student display information.
pub trait UserDirectory: Send + Sync {
    fn student(&self, student_id: &StudentId) -> Result<Option<StudentProfile>, DirectoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: StudentId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Roster entry enriched with directory data where available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub student_id: StudentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Table-backed directory serving both batch membership and profiles.
#[derive(Debug, Clone, Default)]
pub struct StudentDirectory {
    batches: BTreeMap<BatchId, BTreeSet<StudentId>>,
    profiles: HashMap<StudentId, StudentProfile>,
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration used by the demo and tests.
    pub fn with_student(
        mut self,
        batch_id: impl Into<String>,
        student_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        self.insert(
            BatchId::new(batch_id),
            StudentProfile {
                student_id: StudentId::new(student_id),
                display_name: display_name.into(),
                email: None,
            },
        );
        self
    }

    pub fn insert(&mut self, batch_id: BatchId, profile: StudentProfile) {
        self.batches
            .entry(batch_id)
            .or_default()
            .insert(profile.student_id.clone());
        self.profiles.insert(profile.student_id.clone(), profile);
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut directory = Self::new();

        for (index, row) in csv_reader.deserialize::<DirectoryRow>().enumerate() {
            let row = row?;
            // header is line 1
            let line = index + 2;
            if row.batch_id.is_empty() {
                return Err(DirectoryImportError::MissingField {
                    line,
                    field: "batch_id",
                });
            }
            if row.student_id.is_empty() {
                return Err(DirectoryImportError::MissingField {
                    line,
                    field: "student_id",
                });
            }

            let display_name = row
                .display_name
                .unwrap_or_else(|| row.student_id.clone());
            directory.insert(
                BatchId(row.batch_id),
                StudentProfile {
                    student_id: StudentId(row.student_id),
                    display_name,
                    email: row.email,
                },
            );
        }

        Ok(directory)
    }

    pub fn batch_ids(&self) -> Vec<BatchId> {
        self.batches.keys().cloned().collect()
    }

    pub fn student_count(&self) -> usize {
        self.profiles.len()
    }
}

impl BatchDirectory for StudentDirectory {
    fn students_in_batch(&self, batch_id: &BatchId) -> Result<Vec<StudentId>, DirectoryError> {
        Ok(self
            .batches
            .get(batch_id)
            .map(|students| students.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn is_in_batch(
        &self,
        batch_id: &BatchId,
        student_id: &StudentId,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .batches
            .get(batch_id)
            .is_some_and(|students| students.contains(student_id)))
    }
}

impl UserDirectory for StudentDirectory {
    fn student(&self, student_id: &StudentId) -> Result<Option<StudentProfile>, DirectoryError> {
        Ok(self.profiles.get(student_id).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    batch_id: String,
    student_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    display_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug)]
pub enum DirectoryImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingField { line: usize, field: &'static str },
}

impl std::fmt::Display for DirectoryImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryImportError::Io(err) => write!(f, "failed to read directory export: {err}"),
            DirectoryImportError::Csv(err) => write!(f, "invalid directory CSV data: {err}"),
            DirectoryImportError::MissingField { line, field } => {
                write!(f, "directory CSV line {line} is missing {field}")
            }
        }
    }
}

impl std::error::Error for DirectoryImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DirectoryImportError::Io(err) => Some(err),
            DirectoryImportError::Csv(err) => Some(err),
            DirectoryImportError::MissingField { .. } => None,
        }
    }
}

impl From<std::io::Error> for DirectoryImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for DirectoryImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}
