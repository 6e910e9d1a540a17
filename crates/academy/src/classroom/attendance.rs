use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::aggregator;
use super::audit::{emit, AuditAction, AuditEvent, AuditSink};
use super::domain::{
    AttendanceRecord, AttendanceStatus, ClassId, RecordId, RecordStatus, StudentId,
};
use super::error::{ClassroomError, EntityKind};
use super::registry::ClassRegistry;
use super::repository::{AttendanceRepository, RepositoryError};
use super::validation::validate_session_time;
use crate::config::ClassroomConfig;

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id() -> RecordId {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RecordId(format!("att-{id:06}"))
}

/// Attendance sessions: `draft --submit--> final`.
///
/// Writes are optimistic. Each mutation re-reads the record, applies its change, and stores
/// it only if the version is unchanged, retrying up to `max_write_attempts` times. Marks for
/// different students therefore never block each other, and a mark that loses to a submit
/// re-reads a final record and fails with `RecordFinalized`.
pub struct AttendanceSessionStore {
    registry: Arc<ClassRegistry>,
    records: Arc<dyn AttendanceRepository>,
    audit: Arc<dyn AuditSink>,
    config: ClassroomConfig,
}

impl AttendanceSessionStore {
    pub fn new(
        registry: Arc<ClassRegistry>,
        records: Arc<dyn AttendanceRepository>,
        audit: Arc<dyn AuditSink>,
        config: ClassroomConfig,
    ) -> Self {
        Self {
            registry,
            records,
            audit,
            config,
        }
    }

    /// Open a draft for one session, freezing the class roster as it is right now.
    pub fn create_draft(
        &self,
        class_id: &ClassId,
        session_date: NaiveDate,
        session_time: &str,
    ) -> Result<AttendanceRecord, ClassroomError> {
        let session_time = validate_session_time(session_time)?;
        let snapshot = self.registry.roster_snapshot(class_id)?;
        if snapshot.is_empty() && !self.config.allow_empty_roster {
            return Err(ClassroomError::EmptyRoster(class_id.clone()));
        }

        let statuses = BTreeMap::new();
        let counts = aggregator::tally(snapshot.len(), statuses.values());
        let record = AttendanceRecord {
            id: next_record_id(),
            class_id: class_id.clone(),
            session_date,
            session_time,
            status: RecordStatus::Draft,
            snapshot,
            statuses,
            counts,
            version: 0,
            created_at: Utc::now(),
            submitted_at: None,
        };
        let record = self.records.insert(record)?;

        info!(
            record_id = %record.id,
            class_id = %record.class_id,
            session_date = %record.session_date,
            students = record.snapshot.len(),
            "attendance draft created"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::AttendanceDrafted, &record.class_id)
                .detail("record", &record.id)
                .detail("session_date", record.session_date),
        );

        Ok(record)
    }

    /// Set one student's status on a draft. Marking again overwrites the previous status.
    pub fn mark_status(
        &self,
        record_id: &RecordId,
        student_id: &StudentId,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord, ClassroomError> {
        let record = self.write(record_id, |record| {
            if record.is_final() {
                return Err(ClassroomError::RecordFinalized(record.id.clone()));
            }
            if !record.in_snapshot(student_id) {
                return Err(ClassroomError::NotInRoster {
                    record_id: record.id.clone(),
                    student_id: student_id.clone(),
                });
            }
            record.statuses.insert(student_id.clone(), status);
            record.counts = aggregator::tally(record.snapshot.len(), record.statuses.values());
            Ok(())
        })?;

        debug!(
            record_id = %record.id,
            student_id = %student_id,
            status = status.label(),
            "attendance marked"
        );

        Ok(record)
    }

    /// Freeze a draft. Submitting twice is a caller bug and fails with `AlreadyFinal`.
    pub fn submit(&self, record_id: &RecordId) -> Result<AttendanceRecord, ClassroomError> {
        let record = self.write(record_id, |record| {
            if record.is_final() {
                return Err(ClassroomError::AlreadyFinal(record.id.clone()));
            }
            record.status = RecordStatus::Final;
            record.submitted_at = Some(Utc::now());
            Ok(())
        })?;

        info!(
            record_id = %record.id,
            class_id = %record.class_id,
            present = record.counts.present,
            absent = record.counts.absent,
            late = record.counts.late,
            excused = record.counts.excused,
            unmarked = record.counts.unmarked(),
            "attendance submitted"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::AttendanceSubmitted, &record.class_id)
                .detail("record", &record.id),
        );

        Ok(record)
    }

    /// Remove a record whatever its status. Destructive; meant for administrative callers.
    pub fn delete(&self, record_id: &RecordId) -> Result<AttendanceRecord, ClassroomError> {
        let record = self
            .records
            .delete(record_id)?
            .ok_or_else(|| ClassroomError::not_found(EntityKind::AttendanceRecord, record_id))?;

        warn!(
            record_id = %record.id,
            class_id = %record.class_id,
            status = record.status.label(),
            "attendance record deleted"
        );
        emit(
            self.audit.as_ref(),
            AuditEvent::new(AuditAction::AttendanceDeleted, &record.class_id)
                .detail("record", &record.id)
                .detail("status", record.status.label()),
        );

        Ok(record)
    }

    pub fn get(&self, record_id: &RecordId) -> Result<AttendanceRecord, ClassroomError> {
        self.records
            .fetch(record_id)?
            .ok_or_else(|| ClassroomError::not_found(EntityKind::AttendanceRecord, record_id))
    }

    /// Records of a class, newest session first. Works for deleted classes whose history was
    /// kept.
    pub fn list_for_class(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<AttendanceRecord>, ClassroomError> {
        let mut records = self.records.for_class(class_id)?;
        records.sort_by(|left, right| {
            right
                .session_date
                .cmp(&left.session_date)
                .then_with(|| right.session_time.cmp(&left.session_time))
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(records)
    }

    fn write<F>(
        &self,
        record_id: &RecordId,
        mut apply: F,
    ) -> Result<AttendanceRecord, ClassroomError>
    where
        F: FnMut(&mut AttendanceRecord) -> Result<(), ClassroomError>,
    {
        let attempts = self.config.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let mut record = self.get(record_id)?;
            let expected_version = record.version;
            apply(&mut record)?;
            record.version = expected_version + 1;

            match self.records.update(record.clone(), expected_version) {
                Ok(()) => return Ok(record),
                Err(RepositoryError::VersionMismatch { expected, actual }) => {
                    warn!(
                        record_id = %record_id,
                        attempt,
                        expected,
                        actual,
                        "attendance write lost a race, retrying"
                    );
                }
                Err(RepositoryError::NotFound) => {
                    return Err(ClassroomError::not_found(
                        EntityKind::AttendanceRecord,
                        record_id,
                    ))
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(ClassroomError::Conflict {
            entity: EntityKind::AttendanceRecord,
            id: record_id.to_string(),
            attempts,
        })
    }
}
