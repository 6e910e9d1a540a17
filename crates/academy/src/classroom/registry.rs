use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::audit::{emit, AuditAction, AuditEvent, AuditSink};
use super::domain::{BatchId, Class, ClassId, ClassPatch, NewClass, StudentId};
use super::error::{ClassroomError, EntityKind};
use super::locks::LockTable;
use super::repository::{AttendanceRepository, ClassRepository, JoinRequestRepository};
use super::validation::{
    validate_capacity, validate_description, validate_identifier, validate_name,
};

static CLASS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_class_id() -> ClassId {
    let id = CLASS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ClassId(format!("cls-{id:06}"))
}

/// Class names match case-insensitively, Unicode included.
fn same_name(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

/// What a class deletion removed alongside the class itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub class_id: ClassId,
    pub join_requests_removed: usize,
    pub attendance_records_removed: usize,
}

/// Owner of class records and the per-class lock every roster mutation runs under.
///
/// Lock order is batch lock, then class lock. Roster mutations only take the class lock.
pub struct ClassRegistry {
    classes: Arc<dyn ClassRepository>,
    requests: Arc<dyn JoinRequestRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    audit: Arc<dyn AuditSink>,
    class_locks: LockTable<ClassId>,
    batch_locks: LockTable<BatchId>,
}

impl ClassRegistry {
    pub fn new(
        classes: Arc<dyn ClassRepository>,
        requests: Arc<dyn JoinRequestRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            classes,
            requests,
            attendance,
            audit,
            class_locks: LockTable::new(),
            batch_locks: LockTable::new(),
        }
    }

    /// Validate and store a new class with an empty roster.
    pub fn create(&self, new_class: NewClass) -> Result<Class, ClassroomError> {
        validate_identifier("batch_id", new_class.batch_id.as_str())?;
        let name = validate_name(&new_class.name)?;
        let description = validate_description(new_class.description.as_deref())?;
        let capacity = validate_capacity(new_class.capacity)?;
        let batch_id = new_class.batch_id;

        let class = self.batch_locks.with(&batch_id, || -> Result<Class, ClassroomError> {
            self.ensure_unique_name(&batch_id, &name, None)?;
            let now = Utc::now();
            let class = Class {
                id: next_class_id(),
                name,
                description,
                batch_id: batch_id.clone(),
                visibility: new_class.visibility,
                capacity,
                roster: Default::default(),
                active: new_class.active,
                created_at: now,
                updated_at: now,
            };
            Ok(self.classes.insert(class)?)
        })?;

        info!(
            class_id = %class.id,
            batch_id = %class.batch_id,
            visibility = %class.visibility,
            capacity = ?class.capacity,
            "class created"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::ClassCreated, &class.id).detail("name", &class.name),
        );

        Ok(class)
    }

    /// Apply a teacher patch. Capacity may not drop below the current roster size.
    pub fn update(&self, id: &ClassId, patch: ClassPatch) -> Result<Class, ClassroomError> {
        let batch_id = self.get(id)?.batch_id;

        let class = self.batch_locks.with(&batch_id, || {
            self.class_locks.with(id, || -> Result<Class, ClassroomError> {
                let mut class = self.get(id)?;

                if let Some(raw) = patch.name.as_deref() {
                    let name = validate_name(raw)?;
                    if !same_name(&name, &class.name) {
                        self.ensure_unique_name(&class.batch_id, &name, Some(id))?;
                    }
                    class.name = name;
                }
                if let Some(description) = &patch.description {
                    class.description = validate_description(description.as_deref())?;
                }
                if let Some(capacity) = patch.capacity {
                    let capacity = validate_capacity(capacity)?;
                    if let Some(limit) = capacity {
                        if (limit as usize) < class.roster.len() {
                            return Err(ClassroomError::InvalidCapacity {
                                requested: limit,
                                roster_size: class.roster.len(),
                            });
                        }
                    }
                    class.capacity = capacity;
                }
                if let Some(visibility) = patch.visibility {
                    class.visibility = visibility;
                }
                if let Some(active) = patch.active {
                    class.active = active;
                }

                class.updated_at = Utc::now();
                self.classes.update(class.clone())?;
                Ok(class)
            })
        })?;

        info!(class_id = %class.id, "class updated");
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::ClassUpdated, &class.id),
        );

        Ok(class)
    }

    /// Delete a class and its join requests. Attendance history is kept unless
    /// `cascade_attendance` is set.
    pub fn delete(
        &self,
        id: &ClassId,
        cascade_attendance: bool,
    ) -> Result<DeletionSummary, ClassroomError> {
        let summary = self.class_locks.with(id, || -> Result<DeletionSummary, ClassroomError> {
            self.get(id)?;

            let join_requests_removed = self.requests.delete_for_class(id)?;
            let attendance_records_removed = if cascade_attendance {
                self.attendance.delete_for_class(id)?
            } else {
                0
            };
            self.classes
                .delete(id)?
                .ok_or_else(|| ClassroomError::not_found(EntityKind::Class, id))?;

            Ok(DeletionSummary {
                class_id: id.clone(),
                join_requests_removed,
                attendance_records_removed,
            })
        })?;

        info!(
            class_id = %id,
            join_requests_removed = summary.join_requests_removed,
            attendance_records_removed = summary.attendance_records_removed,
            "class deleted"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::ClassDeleted, id)
                .detail("cascade_attendance", cascade_attendance),
        );

        Ok(summary)
    }

    pub fn get(&self, id: &ClassId) -> Result<Class, ClassroomError> {
        self.classes
            .fetch(id)?
            .ok_or_else(|| ClassroomError::not_found(EntityKind::Class, id))
    }

    /// Classes of a batch, ordered by name.
    pub fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Class>, ClassroomError> {
        let mut classes = self.classes.list_by_batch(batch_id)?;
        classes.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(classes)
    }

    /// Look a class up by its batch and (case-insensitive) name.
    pub fn find_by_name(&self, batch_id: &BatchId, name: &str) -> Result<Class, ClassroomError> {
        let wanted = name.trim();
        self.classes
            .list_by_batch(batch_id)?
            .into_iter()
            .find(|class| same_name(&class.name, wanted))
            .ok_or_else(|| {
                ClassroomError::not_found(EntityKind::Class, format!("{batch_id}/{wanted}"))
            })
    }

    /// Sorted copy of the roster as it is right now.
    pub fn roster_snapshot(&self, id: &ClassId) -> Result<Vec<StudentId>, ClassroomError> {
        Ok(self.get(id)?.roster.into_iter().collect())
    }

    /// Run `mutate` against the freshest copy of a class while holding its lock, persisting the
    /// class when the roster changed. An error from `mutate` leaves the stored class untouched.
    pub(crate) fn mutate_roster<T>(
        &self,
        id: &ClassId,
        mutate: impl FnOnce(&mut Class) -> Result<T, ClassroomError>,
    ) -> Result<(Class, T), ClassroomError> {
        self.class_locks.with(id, || -> Result<(Class, T), ClassroomError> {
            let mut class = self.get(id)?;
            let before = class.roster.clone();
            let value = mutate(&mut class)?;
            if class.roster != before {
                class.updated_at = Utc::now();
                self.classes.update(class.clone())?;
            }
            Ok((class, value))
        })
    }

    /// Serialize a non-roster critical section with the roster mutations of a class.
    pub(crate) fn with_class_lock<T>(&self, id: &ClassId, critical: impl FnOnce() -> T) -> T {
        self.class_locks.with(id, critical)
    }

    #[cfg(test)]
    pub(crate) fn held_lock_slots(&self) -> usize {
        self.class_locks.len() + self.batch_locks.len()
    }

    fn ensure_unique_name(
        &self,
        batch_id: &BatchId,
        name: &str,
        except: Option<&ClassId>,
    ) -> Result<(), ClassroomError> {
        let taken = self
            .classes
            .list_by_batch(batch_id)?
            .iter()
            .any(|class| Some(&class.id) != except && same_name(&class.name, name));
        if taken {
            return Err(ClassroomError::DuplicateClassName {
                batch_id: batch_id.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
