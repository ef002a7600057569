use std::collections::HashMap;

use crate::models::{AttendanceEvent, AttendanceStatus, AttendanceSummary, RosterEntry, StudentId};

/// One summary per roster student, in roster order. Students without events
/// get an all-zero summary; events for students outside the roster are dropped.
pub fn summarize_attendance(
    roster: &[RosterEntry],
    events: &[AttendanceEvent],
) -> Vec<AttendanceSummary> {
    let mut summaries: HashMap<StudentId, AttendanceSummary> = roster
        .iter()
        .map(|entry| (entry.student_id, AttendanceSummary::empty(entry.student_id)))
        .collect();

    for event in events {
        let Some(summary) = summaries.get_mut(&event.student_id) else {
            continue;
        };

        match event.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Justified => summary.justified += 1,
        }
        summary.total += 1;
    }

    roster
        .iter()
        .filter_map(|entry| summaries.remove(&entry.student_id))
        .map(|mut summary| {
            summary.attendance_rate = attendance_rate(summary.present, summary.late, summary.total);
            summary
        })
        .collect()
}

pub fn attendance_rate(present: usize, late: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (present + late) as f64 / total as f64 * 100.0
    }
}
