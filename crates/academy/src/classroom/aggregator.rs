//! Pure tallying of attendance marks.

use serde::{Deserialize, Serialize};

use super::domain::AttendanceStatus;

/// Per-status counts for a record. `total` is the snapshot size, so students who have not been
/// marked yet count toward `total` but toward no bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCounts {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
    pub total: u32,
}

impl AttendanceCounts {
    pub fn marked(&self) -> u32 {
        self.present + self.absent + self.late + self.excused
    }

    pub fn unmarked(&self) -> u32 {
        self.total.saturating_sub(self.marked())
    }
}

/// Recompute counts from scratch for a snapshot of `snapshot_len` students.
pub fn tally<'a, I>(snapshot_len: usize, statuses: I) -> AttendanceCounts
where
    I: IntoIterator<Item = &'a AttendanceStatus>,
{
    let mut counts = AttendanceCounts {
        total: u32::try_from(snapshot_len).unwrap_or(u32::MAX),
        ..AttendanceCounts::default()
    };

    for status in statuses {
        match status {
            AttendanceStatus::Present => counts.present += 1,
            AttendanceStatus::Absent => counts.absent += 1,
            AttendanceStatus::Late => counts.late += 1,
            AttendanceStatus::Excused => counts.excused += 1,
        }
    }

    counts
}
