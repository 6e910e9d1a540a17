use std::sync::Arc;

use super::attendance::AttendanceSessionStore;
use super::audit::{AuditSink, TracingAuditSink};
use super::directory::{BatchDirectory, StudentDirectory, UserDirectory};
use super::enrollment::EnrollmentCoordinator;
use super::memory::{
    InMemoryAttendanceRepository, InMemoryClassRepository, InMemoryJoinRequestRepository,
};
use super::registry::ClassRegistry;
use super::repository::{AttendanceRepository, ClassRepository, JoinRequestRepository};
use super::requests::JoinRequestQueue;
use crate::config::ClassroomConfig;

/// Storage and directory collaborators the classroom components are built from.
#[derive(Clone)]
pub struct ClassroomDeps {
    pub classes: Arc<dyn ClassRepository>,
    pub requests: Arc<dyn JoinRequestRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub batches: Arc<dyn BatchDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub audit: Arc<dyn AuditSink>,
}

impl ClassroomDeps {
    /// In-memory stores with one directory answering both batch and profile lookups.
    pub fn in_memory(directory: Arc<StudentDirectory>) -> Self {
        Self {
            classes: Arc::new(InMemoryClassRepository::default()),
            requests: Arc::new(InMemoryJoinRequestRepository::default()),
            attendance: Arc::new(InMemoryAttendanceRepository::default()),
            batches: directory.clone(),
            users: directory,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

/// Facade wiring the registry, enrollment, join queue and attendance store together.
pub struct ClassroomService {
    registry: Arc<ClassRegistry>,
    enrollment: Arc<EnrollmentCoordinator>,
    requests: JoinRequestQueue,
    attendance: AttendanceSessionStore,
    config: ClassroomConfig,
}

impl ClassroomService {
    pub fn new(deps: ClassroomDeps, config: ClassroomConfig) -> Self {
        let registry = Arc::new(ClassRegistry::new(
            deps.classes,
            deps.requests.clone(),
            deps.attendance.clone(),
            deps.audit.clone(),
        ));
        let enrollment = Arc::new(EnrollmentCoordinator::new(
            registry.clone(),
            deps.batches.clone(),
            deps.users,
            deps.audit.clone(),
        ));
        let requests = JoinRequestQueue::new(
            registry.clone(),
            enrollment.clone(),
            deps.requests,
            deps.batches,
            deps.audit.clone(),
        );
        let attendance =
            AttendanceSessionStore::new(registry.clone(), deps.attendance, deps.audit, config);

        Self {
            registry,
            enrollment,
            requests,
            attendance,
            config,
        }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn enrollment(&self) -> &EnrollmentCoordinator {
        &self.enrollment
    }

    pub fn requests(&self) -> &JoinRequestQueue {
        &self.requests
    }

    pub fn attendance(&self) -> &AttendanceSessionStore {
        &self.attendance
    }

    pub fn config(&self) -> ClassroomConfig {
        self.config
    }
}
