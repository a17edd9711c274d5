//! Hold reason resolution
//!
//! Pure functions: given an entry's singers and the attendance of the event,
//! decide whether the entry can play now. Writers persist the result; the
//! queue view overlays it on every read.

use karaoke_common::db::{AttendanceRecord, HoldReason, QueueEntry, SingerList};
use std::collections::HashMap;

/// Attendance of one event keyed by singer id
pub type AttendanceMap = HashMap<String, AttendanceRecord>;

/// Availability of a single singer
///
/// Checked as: missing or not joined, then logged out, then on break.
pub fn singer_hold_reason(record: Option<&AttendanceRecord>) -> HoldReason {
    match record {
        None => HoldReason::NotJoined,
        Some(r) if !r.is_joined => HoldReason::NotJoined,
        Some(r) if !r.is_logged_in => HoldReason::NotLoggedIn,
        Some(r) if r.is_on_break => HoldReason::OnBreak,
        Some(_) => HoldReason::None,
    }
}

/// Reason an entry with these singers cannot play, or `HoldReason::None`
///
/// Group tokens are always available. Individuals are checked in assignment
/// order and the first unavailable singer decides the reason.
pub fn resolve_hold_reason(singers: &SingerList, attendance: &AttendanceMap) -> HoldReason {
    singers
        .individuals()
        .iter()
        .map(|singer| singer_hold_reason(attendance.get(singer)))
        .find(HoldReason::is_blocking)
        .unwrap_or(HoldReason::None)
}

/// Hold an entry should carry right now, if attendance governs it
///
/// Only reorderable entries without a manual DJ hold are governed by
/// attendance; for every other entry the stored flags stand.
pub fn attendance_hold(entry: &QueueEntry, attendance: &AttendanceMap) -> Option<HoldReason> {
    if !entry.is_reorderable() || entry.held_by_dj {
        return None;
    }
    Some(resolve_hold_reason(&entry.singers, attendance))
}

/// True when the stored hold of `entry` differs from `reason`
pub fn hold_differs(entry: &QueueEntry, reason: HoldReason) -> bool {
    entry.hold_reason != reason || entry.is_on_break != reason.is_blocking()
}

/// Copy of `entry` with its attendance hold brought up to date
pub fn with_current_hold(mut entry: QueueEntry, attendance: &AttendanceMap) -> QueueEntry {
    if let Some(reason) = attendance_hold(&entry, attendance) {
        entry.is_on_break = reason.is_blocking();
        entry.hold_reason = reason;
    }
    entry
}
