use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::aggregator::AttendanceCounts;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier issued by the registry for each class.
    ClassId
);
string_id!(
    /// Opaque student identifier owned by the user directory.
    StudentId
);
string_id!(
    /// Opaque cohort identifier owned by the batch directory.
    BatchId
);
string_id!(JoinRequestId);
string_id!(RecordId);

/// Join policy for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Any student of the linked batch may join directly.
    Open,
    /// Students are placed by the teacher only.
    Unlisted,
    /// Students ask to join and a teacher approves or rejects.
    RequestToJoin,
}

impl Visibility {
    pub const fn label(self) -> &'static str {
        match self {
            Visibility::Open => "open",
            Visibility::Unlisted => "unlisted",
            Visibility::RequestToJoin => "request_to_join",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A teacher-managed class linked to one batch.
///
/// The roster never holds more students than `capacity` when a capacity is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub description: Option<String>,
    pub batch_id: BatchId,
    pub visibility: Visibility,
    pub capacity: Option<u32>,
    pub roster: BTreeSet<StudentId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    pub fn roster_size(&self) -> usize {
        self.roster.len()
    }

    pub fn is_member(&self, student_id: &StudentId) -> bool {
        self.roster.contains(student_id)
    }

    /// Free seats left, or `None` for an unlimited class.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| (capacity as usize).saturating_sub(self.roster.len()))
    }

    pub fn is_full(&self) -> bool {
        matches!(self.remaining_capacity(), Some(0))
    }
}

fn default_active() -> bool {
    true
}

/// Teacher input for a new class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClass {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub batch_id: BatchId,
    pub visibility: Visibility,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Partial update for a class. The linked batch is deliberately absent.
///
/// `description` and `capacity` distinguish "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub capacity: Option<Option<u32>>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ClassPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.visibility.is_none()
            && self.capacity.is_none()
            && self.active.is_none()
    }
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Resolution state of a join request. Approved and rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl JoinRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub class_id: ClassId,
    pub student_id: StudentId,
    pub status: JoinRequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl JoinRequest {
    pub fn is_pending(&self) -> bool {
        self.status == JoinRequestStatus::Pending
    }
}

/// Per-student mark recorded during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

/// Attendance record lifecycle: `draft --submit--> final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    Final,
}

impl RecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Final => "final",
        }
    }
}

/// One dated session of a class.
///
/// `snapshot` is fixed when the draft is created; `statuses` only holds snapshot members and
/// `counts` always equals their tally. `version` increments on every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub class_id: ClassId,
    pub session_date: NaiveDate,
    pub session_time: String,
    pub status: RecordStatus,
    pub snapshot: Vec<StudentId>,
    pub statuses: BTreeMap<StudentId, AttendanceStatus>,
    pub counts: AttendanceCounts,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    pub fn is_final(&self) -> bool {
        self.status == RecordStatus::Final
    }

    pub fn in_snapshot(&self, student_id: &StudentId) -> bool {
        self.snapshot.contains(student_id)
    }

    pub fn status_of(&self, student_id: &StudentId) -> Option<AttendanceStatus> {
        self.statuses.get(student_id).copied()
    }
}
