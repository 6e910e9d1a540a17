use super::domain::{
    AttendanceRecord, BatchId, Class, ClassId, JoinRequest, JoinRequestId, RecordId,
};

/// Storage abstraction for class records so the services can be exercised in isolation.
pub trait ClassRepository: Send + Sync {
    fn insert(&self, class: Class) -> Result<Class, RepositoryError>;
    fn update(&self, class: Class) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError>;
    fn delete(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError>;
    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Class>, RepositoryError>;
}

pub trait JoinRequestRepository: Send + Sync {
    fn insert(&self, request: JoinRequest) -> Result<JoinRequest, RepositoryError>;
    fn update(&self, request: JoinRequest) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &JoinRequestId) -> Result<Option<JoinRequest>, RepositoryError>;
    fn for_class(&self, class_id: &ClassId) -> Result<Vec<JoinRequest>, RepositoryError>;
    /// Remove every request of a class, returning how many were dropped.
    fn delete_for_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError>;
}

/// Attendance storage with optimistic concurrency.
///
/// `update` must only replace the stored record when its version equals `expected_version`,
/// and must report [`RepositoryError::VersionMismatch`] otherwise.
pub trait AttendanceRepository: Send + Sync {
    fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError>;
    fn update(
        &self,
        record: AttendanceRecord,
        expected_version: u64,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError>;
    fn for_class(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    fn delete(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError>;
    fn delete_for_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored version {actual} does not match expected version {expected}")]
    VersionMismatch { expected: u64, actual: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
