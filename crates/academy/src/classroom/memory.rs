//! Mutex-backed repositories used by the API service and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::audit::{AuditError, AuditEvent, AuditSink};
use super::domain::{
    AttendanceRecord, BatchId, Class, ClassId, JoinRequest, JoinRequestId, RecordId,
};
use super::repository::{
    AttendanceRepository, ClassRepository, JoinRequestRepository, RepositoryError,
};

#[derive(Default, Clone)]
pub struct InMemoryClassRepository {
    records: Arc<Mutex<HashMap<ClassId, Class>>>,
}

impl ClassRepository for InMemoryClassRepository {
    fn insert(&self, class: Class) -> Result<Class, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&class.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(class.id.clone(), class.clone());
        Ok(class)
    }

    fn update(&self, class: Class) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&class.id) {
            Some(stored) => {
                *stored = class;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &ClassId) -> Result<Option<Class>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }

    fn list_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Class>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|class| &class.batch_id == batch_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryJoinRequestRepository {
    records: Arc<Mutex<HashMap<JoinRequestId, JoinRequest>>>,
}

impl JoinRequestRepository for InMemoryJoinRequestRepository {
    fn insert(&self, request: JoinRequest) -> Result<JoinRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update(&self, request: JoinRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&request.id) {
            Some(stored) => {
                *stored = request;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &JoinRequestId) -> Result<Option<JoinRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_class(&self, class_id: &ClassId) -> Result<Vec<JoinRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| &request.class_id == class_id)
            .cloned()
            .collect())
    }

    fn delete_for_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|_, request| &request.class_id != class_id);
        Ok(before - guard.len())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAttendanceRepository {
    records: Arc<Mutex<HashMap<RecordId, AttendanceRecord>>>,
}

impl AttendanceRepository for InMemoryAttendanceRepository {
    fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: AttendanceRecord,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = record;
        Ok(())
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_class(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.class_id == class_id)
            .cloned()
            .collect())
    }

    fn delete(&self, id: &RecordId) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }

    fn delete_for_class(&self, class_id: &ClassId) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|_, record| &record.class_id != class_id);
        Ok(before - guard.len())
    }
}

/// Audit sink that keeps every event in memory.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().expect("audit mutex poisoned").push(event);
        Ok(())
    }
}
