use std::fmt;

use super::directory::DirectoryError;
use super::domain::{
    BatchId, ClassId, JoinRequestId, JoinRequestStatus, RecordId, StudentId, Visibility,
};
use super::repository::RepositoryError;
use super::validation::ValidationError;

/// Kinds of entity a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Enrollment,
    JoinRequest,
    AttendanceRecord,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Class => "class",
            EntityKind::Enrollment => "enrollment",
            EntityKind::JoinRequest => "join request",
            EntityKind::AttendanceRecord => "attendance record",
        };
        f.write_str(label)
    }
}

/// Every rejection a classroom operation can produce.
///
/// Capacity, visibility and lifecycle variants are business outcomes callers branch on.
#[derive(Debug, thiserror::Error)]
pub enum ClassroomError {
    #[error("invalid {0}")]
    Validation(#[from] ValidationError),
    #[error("capacity {requested} is below the current roster size {roster_size}")]
    InvalidCapacity { requested: u32, roster_size: usize },
    #[error(
        "class {class_id} is full (capacity {capacity}, enrolled {enrolled}, requested {requested})"
    )]
    CapacityExceeded {
        class_id: ClassId,
        capacity: u32,
        enrolled: usize,
        requested: usize,
    },
    #[error("class {class_id} is {visibility} and does not allow this kind of join")]
    VisibilityViolation {
        class_id: ClassId,
        visibility: Visibility,
    },
    #[error("class {0} is not active")]
    ClassInactive(ClassId),
    #[error("student {student_id} is not a member of batch {batch_id}")]
    NotInBatch {
        batch_id: BatchId,
        student_id: StudentId,
    },
    #[error("student {student_id} is already enrolled in class {class_id}")]
    DuplicateEnrollment {
        class_id: ClassId,
        student_id: StudentId,
    },
    #[error("student {student_id} already has a pending request for class {class_id}")]
    DuplicateRequest {
        class_id: ClassId,
        student_id: StudentId,
    },
    #[error("batch {batch_id} already has a class named '{name}'")]
    DuplicateClassName { batch_id: BatchId, name: String },
    #[error("attendance record {0} is final and can no longer change")]
    RecordFinalized(RecordId),
    #[error("attendance record {0} was already submitted")]
    AlreadyFinal(RecordId),
    #[error("student {student_id} is not in the roster snapshot of record {record_id}")]
    NotInRoster {
        record_id: RecordId,
        student_id: StudentId,
    },
    #[error("class {0} has no enrolled students to take attendance for")]
    EmptyRoster(ClassId),
    #[error("join request {request_id} is already {status}")]
    RequestResolved {
        request_id: JoinRequestId,
        status: JoinRequestStatus,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("concurrent updates to {entity} {id} did not settle after {attempts} attempts")]
    Conflict {
        entity: EntityKind,
        id: String,
        attempts: u8,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ClassroomError {
    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ClassroomError::Validation(_) => "validation_error",
            ClassroomError::InvalidCapacity { .. } => "invalid_capacity",
            ClassroomError::CapacityExceeded { .. } => "capacity_exceeded",
            ClassroomError::VisibilityViolation { .. } => "visibility_violation",
            ClassroomError::ClassInactive(_) => "class_inactive",
            ClassroomError::NotInBatch { .. } => "not_in_batch",
            ClassroomError::DuplicateEnrollment { .. } => "duplicate_enrollment",
            ClassroomError::DuplicateRequest { .. } => "duplicate_request",
            ClassroomError::DuplicateClassName { .. } => "duplicate_class_name",
            ClassroomError::RecordFinalized(_) => "record_finalized",
            ClassroomError::AlreadyFinal(_) => "already_final",
            ClassroomError::NotInRoster { .. } => "not_in_roster",
            ClassroomError::EmptyRoster(_) => "empty_roster",
            ClassroomError::RequestResolved { .. } => "request_resolved",
            ClassroomError::NotFound { .. } => "not_found",
            ClassroomError::Conflict { .. } => "conflict",
            ClassroomError::Repository(_) => "repository_error",
            ClassroomError::Directory(_) => "directory_error",
        }
    }

    /// Offending field for validation-style rejections.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ClassroomError::Validation(err) => Some(err.field),
            ClassroomError::InvalidCapacity { .. } => Some("capacity"),
            _ => None,
        }
    }
}
