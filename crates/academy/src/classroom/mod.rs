//! Classes, enrollment, join requests, and attendance sessions.
//!
//! [`ClassroomService`] wires the components together over the storage traits in
//! [`repository`] and the directory traits in [`directory`]. Every roster change for a class
//! runs under that class's lock, so a configured capacity is never exceeded even when joins
//! and bulk adds race. Attendance records snapshot the roster when drafted and are frozen once
//! submitted.

pub mod aggregator;
pub mod attendance;
pub mod audit;
pub mod directory;
pub mod domain;
pub mod enrollment;
pub mod error;
pub(crate) mod locks;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod requests;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use aggregator::{tally, AttendanceCounts};
pub use attendance::AttendanceSessionStore;
pub use audit::{AuditAction, AuditError, AuditEvent, AuditSink, TracingAuditSink};
pub use directory::{
    BatchDirectory, DirectoryError, DirectoryImportError, StudentDirectory, StudentProfile,
    StudentSummary, UserDirectory,
};
pub use domain::{
    AttendanceRecord, AttendanceStatus, BatchId, Class, ClassId, ClassPatch, JoinRequest,
    JoinRequestId, JoinRequestStatus, NewClass, RecordId, RecordStatus, StudentId, Visibility,
};
pub use enrollment::{EnrollmentCoordinator, EnrollmentOutcome};
pub use error::{ClassroomError, EntityKind};
pub use memory::{
    InMemoryAttendanceRepository, InMemoryAuditLog, InMemoryClassRepository,
    InMemoryJoinRequestRepository,
};
pub use registry::{ClassRegistry, DeletionSummary};
pub use repository::{
    AttendanceRepository, ClassRepository, JoinRequestRepository, RepositoryError,
};
pub use requests::JoinRequestQueue;
pub use router::classroom_router;
pub use service::{ClassroomDeps, ClassroomService};
pub use validation::ValidationError;
