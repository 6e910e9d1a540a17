use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::audit::{emit, AuditAction, AuditEvent, AuditSink};
use super::directory::BatchDirectory;
use super::domain::{
    ClassId, JoinRequest, JoinRequestId, JoinRequestStatus, StudentId, Visibility,
};
use super::enrollment::EnrollmentCoordinator;
use super::error::{ClassroomError, EntityKind};
use super::locks::LockTable;
use super::registry::ClassRegistry;
use super::repository::JoinRequestRepository;
use super::validation::validate_identifier;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> JoinRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JoinRequestId(format!("jrq-{id:06}"))
}

/// Pending join requests for request-to-join classes.
///
/// Capacity is checked when a request is approved, not when it is filed.
pub struct JoinRequestQueue {
    registry: Arc<ClassRegistry>,
    enrollment: Arc<EnrollmentCoordinator>,
    requests: Arc<dyn JoinRequestRepository>,
    batches: Arc<dyn BatchDirectory>,
    audit: Arc<dyn AuditSink>,
    request_locks: LockTable<JoinRequestId>,
}

impl JoinRequestQueue {
    pub fn new(
        registry: Arc<ClassRegistry>,
        enrollment: Arc<EnrollmentCoordinator>,
        requests: Arc<dyn JoinRequestRepository>,
        batches: Arc<dyn BatchDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            enrollment,
            requests,
            batches,
            audit,
            request_locks: LockTable::new(),
        }
    }

    /// File a pending request. At most one pending request exists per class and student.
    pub fn request_join(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<JoinRequest, ClassroomError> {
        validate_identifier("student_id", student_id.as_str())?;

        let batch_id = self.registry.get(class_id)?.batch_id;
        if !self.batches.is_in_batch(&batch_id, student_id)? {
            return Err(ClassroomError::NotInBatch {
                batch_id,
                student_id: student_id.clone(),
            });
        }

        let request = self
            .registry
            .with_class_lock(class_id, || -> Result<JoinRequest, ClassroomError> {
                let class = self.registry.get(class_id)?;
                if class.visibility != Visibility::RequestToJoin {
                    return Err(ClassroomError::VisibilityViolation {
                        class_id: class.id,
                        visibility: class.visibility,
                    });
                }
                if !class.active {
                    return Err(ClassroomError::ClassInactive(class.id));
                }
                if class.is_member(student_id) {
                    return Err(ClassroomError::DuplicateEnrollment {
                        class_id: class.id,
                        student_id: student_id.clone(),
                    });
                }

                let duplicate = self
                    .requests
                    .for_class(class_id)?
                    .iter()
                    .any(|existing| existing.is_pending() && &existing.student_id == student_id);
                if duplicate {
                    return Err(ClassroomError::DuplicateRequest {
                        class_id: class_id.clone(),
                        student_id: student_id.clone(),
                    });
                }

                let request = JoinRequest {
                    id: next_request_id(),
                    class_id: class_id.clone(),
                    student_id: student_id.clone(),
                    status: JoinRequestStatus::Pending,
                    requested_at: Utc::now(),
                    resolved_at: None,
                };
                Ok(self.requests.insert(request)?)
            })?;

        info!(
            request_id = %request.id,
            class_id = %request.class_id,
            student_id = %request.student_id,
            "join request filed"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::JoinRequested, &request.class_id)
                .detail("request", &request.id)
                .detail("student", &request.student_id),
        );

        Ok(request)
    }

    /// Enroll the requesting student, re-checking capacity now.
    ///
    /// When enrollment fails the request stays pending and the enrollment error is returned.
    pub fn approve(&self, request_id: &JoinRequestId) -> Result<JoinRequest, ClassroomError> {
        let request = self
            .request_locks
            .with(request_id, || self.approve_pending(request_id))?;

        info!(
            request_id = %request.id,
            class_id = %request.class_id,
            student_id = %request.student_id,
            "join request approved"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::JoinApproved, &request.class_id)
                .detail("request", &request.id)
                .detail("student", &request.student_id),
        );

        Ok(request)
    }

    /// Close a pending request without touching the roster.
    pub fn reject(&self, request_id: &JoinRequestId) -> Result<JoinRequest, ClassroomError> {
        let request = self
            .request_locks
            .with(request_id, || self.resolve_pending(request_id, JoinRequestStatus::Rejected))?;

        info!(
            request_id = %request.id,
            class_id = %request.class_id,
            "join request rejected"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::JoinRejected, &request.class_id)
                .detail("request", &request.id)
                .detail("student", &request.student_id),
        );

        Ok(request)
    }

    pub fn get(&self, request_id: &JoinRequestId) -> Result<JoinRequest, ClassroomError> {
        self.requests
            .fetch(request_id)?
            .ok_or_else(|| ClassroomError::not_found(EntityKind::JoinRequest, request_id))
    }

    /// Pending requests of a class, oldest first.
    pub fn pending_for_class(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<JoinRequest>, ClassroomError> {
        self.registry.get(class_id)?;
        let mut pending: Vec<JoinRequest> = self
            .requests
            .for_class(class_id)?
            .into_iter()
            .filter(JoinRequest::is_pending)
            .collect();
        pending.sort_by(|left, right| {
            left.requested_at
                .cmp(&right.requested_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(pending)
    }

    #[cfg(test)]
    pub(crate) fn held_lock_slots(&self) -> usize {
        self.request_locks.len()
    }

    fn approve_pending(&self, request_id: &JoinRequestId) -> Result<JoinRequest, ClassroomError> {
        let request = self.pending(request_id)?;
        self.enrollment
            .add_students(&request.class_id, slice::from_ref(&request.student_id))?;
        self.resolve_pending(request_id, JoinRequestStatus::Approved)
    }

    fn resolve_pending(
        &self,
        request_id: &JoinRequestId,
        status: JoinRequestStatus,
    ) -> Result<JoinRequest, ClassroomError> {
        let mut request = self.pending(request_id)?;
        request.status = status;
        request.resolved_at = Some(Utc::now());
        self.requests.update(request.clone())?;
        Ok(request)
    }

    fn pending(&self, request_id: &JoinRequestId) -> Result<JoinRequest, ClassroomError> {
        let request = self.get(request_id)?;
        if !request.is_pending() {
            return Err(ClassroomError::RequestResolved {
                request_id: request.id,
                status: request.status,
            });
        }
        Ok(request)
    }
}
