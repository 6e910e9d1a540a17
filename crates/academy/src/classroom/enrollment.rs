use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::audit::{emit, AuditAction, AuditEvent, AuditSink};
use super::directory::{BatchDirectory, StudentSummary, UserDirectory};
use super::domain::{Class, ClassId, StudentId, Visibility};
use super::error::{ClassroomError, EntityKind};
use super::registry::ClassRegistry;
use super::validation::{validate_identifier, ValidationError};

/// Result of a bulk enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentOutcome {
    pub class_id: ClassId,
    pub added: Vec<StudentId>,
    /// Ids that were already enrolled (or repeated in the request).
    pub skipped: Vec<StudentId>,
    pub roster_size: usize,
}

/// Admits and removes students while holding the class lock, so capacity checks and roster
/// writes are a single critical section.
pub struct EnrollmentCoordinator {
    registry: Arc<ClassRegistry>,
    batches: Arc<dyn BatchDirectory>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl EnrollmentCoordinator {
    pub fn new(
        registry: Arc<ClassRegistry>,
        batches: Arc<dyn BatchDirectory>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            batches,
            users,
            audit,
        }
    }

    /// Self-service join for an open, active class with a free seat.
    pub fn join_open(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<Class, ClassroomError> {
        validate_identifier("student_id", student_id.as_str())?;

        // batch never changes, so membership can be resolved outside the lock
        let batch_id = self.registry.get(class_id)?.batch_id;
        if !self.batches.is_in_batch(&batch_id, student_id)? {
            return Err(ClassroomError::NotInBatch {
                batch_id,
                student_id: student_id.clone(),
            });
        }

        let (class, ()) = self.registry.mutate_roster(class_id, |class| {
            if class.visibility != Visibility::Open {
                return Err(ClassroomError::VisibilityViolation {
                    class_id: class.id.clone(),
                    visibility: class.visibility,
                });
            }
            if !class.active {
                return Err(ClassroomError::ClassInactive(class.id.clone()));
            }
            if class.is_member(student_id) {
                return Err(ClassroomError::DuplicateEnrollment {
                    class_id: class.id.clone(),
                    student_id: student_id.clone(),
                });
            }
            ensure_room(class, 1)?;
            class.roster.insert(student_id.clone());
            Ok(())
        })?;

        info!(
            class_id = %class.id,
            student_id = %student_id,
            roster_size = class.roster_size(),
            "student joined open class"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::StudentsEnrolled, &class.id)
                .detail("students", student_id)
                .detail("via", "join_open"),
        );

        Ok(class)
    }

    /// Administrative all-or-nothing bulk add, valid for any visibility.
    ///
    /// Already-enrolled and repeated ids are skipped; only the distinct new ids have to fit in
    /// the remaining capacity, otherwise nothing is added.
    pub fn add_students(
        &self,
        class_id: &ClassId,
        student_ids: &[StudentId],
    ) -> Result<EnrollmentOutcome, ClassroomError> {
        if student_ids.is_empty() {
            return Err(
                ValidationError::new("student_ids", "must list at least one student").into(),
            );
        }
        for student_id in student_ids {
            validate_identifier("student_ids", student_id.as_str())?;
        }

        let (class, (added, skipped)) = self.registry.mutate_roster(class_id, |class| {
            let mut seen = BTreeSet::new();
            let mut added = Vec::new();
            let mut skipped = Vec::new();
            for student_id in student_ids {
                if class.is_member(student_id) || !seen.insert(student_id) {
                    skipped.push(student_id.clone());
                } else {
                    added.push(student_id.clone());
                }
            }

            ensure_room(class, added.len())?;
            class.roster.extend(added.iter().cloned());
            Ok((added, skipped))
        })?;

        info!(
            class_id = %class.id,
            added = added.len(),
            skipped = skipped.len(),
            roster_size = class.roster_size(),
            "students added to class"
        );
        if !added.is_empty() {
            let names: Vec<&str> = added.iter().map(StudentId::as_str).collect();
            emit(
                self.audit.as_ref(),
                AuditEvent::new(AuditAction::StudentsEnrolled, &class.id)
                    .detail("students", names.join(","))
                    .detail("via", "add_students"),
            );
        }

        Ok(EnrollmentOutcome {
            class_id: class.id.clone(),
            roster_size: class.roster_size(),
            added,
            skipped,
        })
    }

    /// Remove one student. A non-member yields `NotFound` and the roster is left as is.
    ///
    /// Attendance records keep their own snapshots and are never touched here.
    pub fn remove_student(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<Class, ClassroomError> {
        let (class, ()) = self.registry.mutate_roster(class_id, |class| {
            if class.roster.remove(student_id) {
                Ok(())
            } else {
                Err(ClassroomError::not_found(
                    EntityKind::Enrollment,
                    format!("{}/{student_id}", class.id),
                ))
            }
        })?;

        info!(
            class_id = %class.id,
            student_id = %student_id,
            roster_size = class.roster_size(),
            "student removed from class"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::StudentRemoved, &class.id).detail("student", student_id),
        );

        Ok(class)
    }

    /// Batch members who are not on the roster yet, ordered by id.
    pub fn eligible_students(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<StudentSummary>, ClassroomError> {
        let class = self.registry.get(class_id)?;
        let mut candidates: Vec<StudentId> = self
            .batches
            .students_in_batch(&class.batch_id)?
            .into_iter()
            .filter(|student_id| !class.is_member(student_id))
            .collect();
        candidates.sort();
        candidates.dedup();
        self.summarize(candidates)
    }

    /// Current roster resolved against the user directory.
    pub fn roster(&self, class_id: &ClassId) -> Result<Vec<StudentSummary>, ClassroomError> {
        let snapshot = self.registry.roster_snapshot(class_id)?;
        self.summarize(snapshot)
    }

    fn summarize(
        &self,
        student_ids: Vec<StudentId>,
    ) -> Result<Vec<StudentSummary>, ClassroomError> {
        student_ids
            .into_iter()
            .map(|student_id| -> Result<StudentSummary, ClassroomError> {
                let display_name = self
                    .users
                    .student(&student_id)?
                    .map(|profile| profile.display_name);
                Ok(StudentSummary {
                    student_id,
                    display_name,
                })
            })
            .collect()
    }
}

fn ensure_room(class: &Class, requested: usize) -> Result<(), ClassroomError> {
    match (class.capacity, class.remaining_capacity()) {
        (Some(capacity), Some(remaining)) if remaining < requested => {
            Err(ClassroomError::CapacityExceeded {
                class_id: class.id.clone(),
                capacity,
                enrolled: class.roster_size(),
                requested,
            })
        }
        _ => Ok(()),
    }
}
