use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::{CourseId, Enrollment, RosterEntry, StudentId};

/// Collapses enrollment rows into one entry per distinct student enrolled in
/// any of `course_ids`. Rows for other courses are skipped.
pub fn resolve_roster(course_ids: &[CourseId], enrollments: &[Enrollment]) -> Vec<RosterEntry> {
    if course_ids.is_empty() {
        return Vec::new();
    }

    let wanted: HashSet<CourseId> = course_ids.iter().copied().collect();
    let mut students: BTreeMap<StudentId, (Option<String>, BTreeSet<CourseId>)> = BTreeMap::new();

    for enrollment in enrollments {
        if !wanted.contains(&enrollment.course_id) {
            continue;
        }

        let entry = students
            .entry(enrollment.student_id)
            .or_insert_with(|| (None, BTreeSet::new()));
        if entry.0.is_none() {
            entry.0 = enrollment.student_name.clone();
        }
        entry.1.insert(enrollment.course_id);
    }

    students
        .into_iter()
        .map(|(student_id, (student_name, courses))| RosterEntry {
            student_id,
            student_name,
            course_ids: courses.into_iter().collect(),
        })
        .collect()
}

pub fn student_ids(roster: &[RosterEntry]) -> Vec<StudentId> {
    roster.iter().map(|entry| entry.student_id).collect()
}
