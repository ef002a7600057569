use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub Uuid);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Justified,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Justified => "justified",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "late" => Ok(AttendanceStatus::Late),
            "absent" => Ok(AttendanceStatus::Absent),
            // The portal stores justified absences as "excused".
            "justified" | "excused" => Ok(AttendanceStatus::Justified),
            other => anyhow::bail!("unknown attendance status: {other:?}"),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AttendanceEvent {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
}

/// A graded submission, already normalized to the policy's score scale.
#[derive(Debug, Clone, Copy)]
pub struct GradeEvent {
    pub student_id: StudentId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub course_ids: Vec<CourseId>,
}

impl RosterEntry {
    pub fn display_name(&self) -> String {
        self.student_name
            .clone()
            .unwrap_or_else(|| self.student_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub student_id: StudentId,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub justified: usize,
    pub total: usize,
    pub attendance_rate: f64,
}

impl AttendanceSummary {
    pub fn empty(student_id: StudentId) -> Self {
        Self {
            student_id,
            present: 0,
            late: 0,
            absent: 0,
            justified: 0,
            total: 0,
            attendance_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub student_id: StudentId,
    pub band_excellent: usize,
    pub band_good: usize,
    pub band_acceptable: usize,
    pub band_low: usize,
    pub total_graded: usize,
    pub average_score: f64,
}

impl GradeSummary {
    pub fn empty(student_id: StudentId) -> Self {
        Self {
            student_id,
            band_excellent: 0,
            band_good: 0,
            band_acceptable: 0,
            band_low: 0,
            total_graded: 0,
            average_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentDashboard {
    pub student: RosterEntry,
    pub attendance: AttendanceSummary,
    pub grades: GradeSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_statuses_case_insensitively() {
        assert_eq!("Present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert_eq!(" late ".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Late);
        assert_eq!("ABSENT".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
    }

    #[test]
    fn excused_is_an_alias_for_justified() {
        assert_eq!("excused".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Justified);
        assert_eq!("justified".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Justified);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("sick".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let id = StudentId(Uuid::new_v4());
        let entry = RosterEntry {
            student_id: id,
            student_name: None,
            course_ids: Vec::new(),
        };
        assert_eq!(entry.display_name(), id.to_string());
    }
}
