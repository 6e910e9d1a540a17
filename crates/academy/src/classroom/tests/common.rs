use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::classroom::audit::{AuditError, AuditEvent, AuditSink};
use crate::classroom::directory::StudentDirectory;
use crate::classroom::domain::{
    AttendanceRecord, BatchId, Class, ClassId, JoinRequest, JoinRequestId, NewClass, RecordId,
    StudentId, Visibility,
};
use crate::classroom::memory::{InMemoryAttendanceRepository, InMemoryAuditLog};
use crate::classroom::repository::{
    AttendanceRepository, ClassRepository, JoinRequestRepository, RepositoryError,
};
use crate::classroom::service::{ClassroomDeps, ClassroomService};
use crate::config::ClassroomConfig;

pub(super) const BATCH: &str = "batch-2025";
pub(super) const OTHER_BATCH: &str = "batch-2026";

pub(super) fn batch() -> BatchId {
    BatchId::new(BATCH)
}

pub(super) fn student(n: usize) -> StudentId {
    StudentId::new(format!("stu-{n:03}"))
}

pub(super) fn students(range: std::ops::RangeInclusive<usize>) -> Vec<StudentId> {
    range.map(student).collect()
}

/// Thirty students in `BATCH` and one outsider, `stu-900`, in `OTHER_BATCH`.
pub(super) fn directory() -> StudentDirectory {
    let mut directory = StudentDirectory::new();
    for n in 1..=30 {
        directory = directory.with_student(BATCH, format!("stu-{n:03}"), format!("Student {n}"));
    }
    directory.with_student(OTHER_BATCH, "stu-900", "Outsider")
}

pub(super) fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).expect("valid date")
}

pub(super) fn build_service_with(
    config: ClassroomConfig,
) -> (Arc<ClassroomService>, InMemoryAuditLog) {
    let audit = InMemoryAuditLog::default();
    let deps = ClassroomDeps::in_memory(Arc::new(directory())).with_audit(Arc::new(audit.clone()));
    (Arc::new(ClassroomService::new(deps, config)), audit)
}

pub(super) fn build_service() -> (Arc<ClassroomService>, InMemoryAuditLog) {
    build_service_with(ClassroomConfig::default())
}

pub(super) fn new_class(name: &str, visibility: Visibility, capacity: Option<u32>) -> NewClass {
    NewClass {
        name: name.to_string(),
        description: None,
        batch_id: batch(),
        visibility,
        capacity,
        active: true,
    }
}

pub(super) fn create_class(
    service: &ClassroomService,
    name: &str,
    visibility: Visibility,
    capacity: Option<u32>,
) -> Class {
    service
        .registry()
        .create(new_class(name, visibility, capacity))
        .expect("class created")
}

/// Class with `roster` already enrolled through the administrative path.
pub(super) fn class_with_roster(
    service: &ClassroomService,
    name: &str,
    visibility: Visibility,
    capacity: Option<u32>,
    roster: &[StudentId],
) -> Class {
    let class = create_class(service, name, visibility, capacity);
    if !roster.is_empty() {
        service
            .enrollment()
            .add_students(&class.id, roster)
            .expect("roster seeded");
    }
    service.registry().get(&class.id).expect("class exists")
}

/// Attendance store whose compare-and-swap never succeeds.
#[derive(Default)]
pub(super) struct StaleAttendanceRepository {
    inner: InMemoryAttendanceRepository,
}

impl AttendanceRepository for StaleAttendanceRepository {
    fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn update(
        &self,
        _record: AttendanceRecord,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::VersionMismatch {
            expected: expected_version,
            actual: expected_version + 1,
        })
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_class(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        self.inner.for_class(class_id)
    }

    fn delete(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError> {
        self.inner.delete(id)
    }

    fn delete_for_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError> {
        self.inner.delete_for_class(class_id)
    }
}

pub(super) struct UnavailableRepository;

impl ClassRepository for UnavailableRepository {
    fn insert(&self, _class: Class) -> Result<Class, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _class: Class) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_batch(&self, _batch_id: &BatchId) -> Result<Vec<Class>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl JoinRequestRepository for UnavailableRepository {
    fn insert(&self, _request: JoinRequest) -> Result<JoinRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _request: JoinRequest) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &JoinRequestId) -> Result<Option<JoinRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_class(&self, _class_id: &ClassId) -> Result<Vec<JoinRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_for_class(&self, _class_id: &ClassId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Sink that refuses every event.
pub(super) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Transport("broker unreachable".to_string()))
    }
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
