use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::attendance::summarize_attendance;
use crate::error::DashboardError;
use crate::grades::summarize_grades;
use crate::models::{
    AttendanceEvent, AttendanceSummary, CourseId, Enrollment, GradeEvent, GradeSummary,
    StudentDashboard, StudentId,
};
use crate::policy::{AttendanceHealth, DashboardPolicy, GradeBand};
use crate::roster::{resolve_roster, student_ids};

/// Batched read access to the records a dashboard is built from.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_enrollments(&self, course_ids: &[CourseId]) -> anyhow::Result<Vec<Enrollment>>;

    async fn fetch_attendance(
        &self,
        student_ids: &[StudentId],
        course_ids: &[CourseId],
    ) -> anyhow::Result<Vec<AttendanceEvent>>;

    /// Scores must already be on the policy's grade scale.
    async fn fetch_grades(
        &self,
        student_ids: &[StudentId],
        course_ids: &[CourseId],
    ) -> anyhow::Result<Vec<GradeEvent>>;
}

pub async fn assemble_dashboard<S>(
    source: &S,
    course_ids: &[CourseId],
    policy: &DashboardPolicy,
) -> Result<Vec<StudentDashboard>, DashboardError>
where
    S: DashboardSource + ?Sized,
{
    if course_ids.is_empty() {
        debug!("no courses requested, skipping dashboard assembly");
        return Ok(Vec::new());
    }

    let enrollments = source
        .fetch_enrollments(course_ids)
        .await
        .map_err(DashboardError::RosterFetchFailed)?;
    let roster = resolve_roster(course_ids, &enrollments);

    if roster.is_empty() {
        info!(courses = course_ids.len(), "no students enrolled in requested courses");
        return Ok(Vec::new());
    }

    let ids = student_ids(&roster);
    let attendance = async {
        let events = source
            .fetch_attendance(&ids, course_ids)
            .await
            .map_err(DashboardError::AttendanceFetchFailed)?;
        debug!(events = events.len(), "attendance records fetched");
        Ok::<_, DashboardError>(summarize_attendance(&roster, &events))
    };
    let grades = async {
        let events = source
            .fetch_grades(&ids, course_ids)
            .await
            .map_err(DashboardError::GradeFetchFailed)?;
        debug!(events = events.len(), "graded submissions fetched");
        Ok::<_, DashboardError>(summarize_grades(&roster, &events, &policy.grades))
    };

    let (attendance, grades) = tokio::try_join!(attendance, grades)?;

    let rows: Vec<StudentDashboard> = roster
        .into_iter()
        .zip(attendance)
        .zip(grades)
        .map(|((student, attendance), grades)| StudentDashboard {
            student,
            attendance,
            grades,
        })
        .collect();

    info!(
        courses = course_ids.len(),
        students = rows.len(),
        "dashboard assembled"
    );
    Ok(rows)
}

/// Class-level rollup of assembled dashboard rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOverview {
    pub student_count: usize,
    pub mean_attendance_rate: f64,
    pub mean_average_score: f64,
    pub band_excellent: usize,
    pub band_good: usize,
    pub band_acceptable: usize,
    pub band_low: usize,
    pub health_excellent: usize,
    pub health_good: usize,
    pub health_fair: usize,
    pub health_poor: usize,
}

impl DashboardOverview {
    /// Means only count students that have at least one session or graded item.
    pub fn from_rows(rows: &[StudentDashboard], policy: &DashboardPolicy) -> Self {
        let mut overview = DashboardOverview {
            student_count: rows.len(),
            mean_attendance_rate: 0.0,
            mean_average_score: 0.0,
            band_excellent: 0,
            band_good: 0,
            band_acceptable: 0,
            band_low: 0,
            health_excellent: 0,
            health_good: 0,
            health_fair: 0,
            health_poor: 0,
        };

        let mut rate_sum = 0.0;
        let mut rate_count = 0usize;
        let mut score_sum = 0.0;
        let mut score_count = 0usize;

        for row in rows {
            let grades = &row.grades;
            overview.band_excellent += grades.band_excellent;
            overview.band_good += grades.band_good;
            overview.band_acceptable += grades.band_acceptable;
            overview.band_low += grades.band_low;

            if grades.total_graded > 0 {
                score_sum += grades.average_score;
                score_count += 1;
            }

            if row.attendance.total > 0 {
                rate_sum += row.attendance.attendance_rate;
                rate_count += 1;
                match attendance_health(&row.attendance, policy) {
                    Some(AttendanceHealth::Excellent) => overview.health_excellent += 1,
                    Some(AttendanceHealth::Good) => overview.health_good += 1,
                    Some(AttendanceHealth::Fair) => overview.health_fair += 1,
                    Some(AttendanceHealth::Poor) => overview.health_poor += 1,
                    None => {}
                }
            }
        }

        if rate_count > 0 {
            overview.mean_attendance_rate = rate_sum / rate_count as f64;
        }
        if score_count > 0 {
            overview.mean_average_score = score_sum / score_count as f64;
        }
        overview
    }
}

/// `None` when the student has no recorded sessions.
pub fn attendance_health(
    summary: &AttendanceSummary,
    policy: &DashboardPolicy,
) -> Option<AttendanceHealth> {
    (summary.total > 0).then(|| policy.attendance.health(summary.attendance_rate))
}

/// Band of the student's average, `None` when nothing has been graded.
pub fn average_band(summary: &GradeSummary, policy: &DashboardPolicy) -> Option<GradeBand> {
    (summary.total_graded > 0).then(|| policy.grades.band(summary.average_score))
}

pub fn needs_attention(row: &StudentDashboard, policy: &DashboardPolicy) -> bool {
    attendance_health(&row.attendance, policy) == Some(AttendanceHealth::Poor)
        || average_band(&row.grades, policy) == Some(GradeBand::Low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeSource {
        enrollments: Vec<Enrollment>,
        attendance: Vec<AttendanceEvent>,
        grades: Vec<GradeEvent>,
        fail_roster: bool,
        fail_attendance: bool,
        fail_grades: bool,
        enrollment_calls: AtomicUsize,
        attendance_calls: AtomicUsize,
        grade_calls: AtomicUsize,
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn fetch_enrollments(&self, _course_ids: &[CourseId]) -> anyhow::Result<Vec<Enrollment>> {
            self.enrollment_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_roster {
                anyhow::bail!("enrollments table unavailable");
            }
            Ok(self.enrollments.clone())
        }

        async fn fetch_attendance(
            &self,
            _student_ids: &[StudentId],
            _course_ids: &[CourseId],
        ) -> anyhow::Result<Vec<AttendanceEvent>> {
            self.attendance_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_attendance {
                anyhow::bail!("attendance table unavailable");
            }
            Ok(self.attendance.clone())
        }

        async fn fetch_grades(
            &self,
            _student_ids: &[StudentId],
            _course_ids: &[CourseId],
        ) -> anyhow::Result<Vec<GradeEvent>> {
            self.grade_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_grades {
                anyhow::bail!("submissions table unavailable");
            }
            Ok(self.grades.clone())
        }
    }

    fn sample_source() -> (FakeSource, CourseId, StudentId, StudentId) {
        let course = CourseId(Uuid::new_v4());
        let lucia = StudentId(Uuid::new_v4());
        let mateo = StudentId(Uuid::new_v4());

        let source = FakeSource {
            enrollments: vec![
                Enrollment {
                    student_id: lucia,
                    course_id: course,
                    student_name: Some("Lucia Fernandez".to_string()),
                },
                Enrollment {
                    student_id: mateo,
                    course_id: course,
                    student_name: Some("Mateo Rojas".to_string()),
                },
            ],
            attendance: vec![
                AttendanceEvent { student_id: lucia, status: AttendanceStatus::Present },
                AttendanceEvent { student_id: lucia, status: AttendanceStatus::Present },
                AttendanceEvent { student_id: lucia, status: AttendanceStatus::Late },
                AttendanceEvent { student_id: lucia, status: AttendanceStatus::Absent },
                AttendanceEvent { student_id: mateo, status: AttendanceStatus::Absent },
            ],
            grades: vec![
                GradeEvent { student_id: lucia, score: 18.0 },
                GradeEvent { student_id: lucia, score: 14.0 },
                GradeEvent { student_id: mateo, score: 8.0 },
            ],
            ..FakeSource::default()
        };
        (source, course, lucia, mateo)
    }

    #[tokio::test]
    async fn combines_attendance_and_grades_per_student() {
        let (source, course, lucia, mateo) = sample_source();
        let rows = assemble_dashboard(&source, &[course], &DashboardPolicy::default())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let lucia_row = rows.iter().find(|r| r.student.student_id == lucia).unwrap();
        assert_eq!(lucia_row.attendance.student_id, lucia);
        assert_eq!(lucia_row.grades.student_id, lucia);
        assert!((lucia_row.attendance.attendance_rate - 75.0).abs() < 1e-9);
        assert!((lucia_row.grades.average_score - 16.0).abs() < 1e-9);

        let mateo_row = rows.iter().find(|r| r.student.student_id == mateo).unwrap();
        assert_eq!(mateo_row.attendance.absent, 1);
        assert_eq!(mateo_row.grades.band_low, 1);
        assert!(needs_attention(mateo_row, &DashboardPolicy::default()));
        assert!(!needs_attention(lucia_row, &DashboardPolicy::default()));

        assert_eq!(source.enrollment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.attendance_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.grade_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_course_list_touches_nothing() {
        let (source, _, _, _) = sample_source();
        let rows = assemble_dashboard(&source, &[], &DashboardPolicy::default())
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(source.enrollment_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.attendance_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.grade_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_roster_skips_event_fetches() {
        let source = FakeSource::default();
        let rows = assemble_dashboard(&source, &[CourseId(Uuid::new_v4())], &DashboardPolicy::default())
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(source.enrollment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.attendance_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.grade_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn grade_failure_rejects_whole_assembly() {
        let (mut source, course, _, _) = sample_source();
        source.fail_grades = true;

        let err = assemble_dashboard(&source, &[course], &DashboardPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::GradeFetchFailed(_)));
    }

    #[tokio::test]
    async fn attendance_failure_rejects_whole_assembly() {
        let (mut source, course, _, _) = sample_source();
        source.fail_attendance = true;

        let err = assemble_dashboard(&source, &[course], &DashboardPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::AttendanceFetchFailed(_)));
    }

    #[tokio::test]
    async fn roster_failure_is_propagated() {
        let (mut source, course, _, _) = sample_source();
        source.fail_roster = true;

        let err = assemble_dashboard(&source, &[course], &DashboardPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::RosterFetchFailed(_)));
        assert_eq!(source.attendance_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.grade_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overview_ignores_students_without_data() {
        let (mut source, course, _, _) = sample_source();
        let newcomer = StudentId(Uuid::new_v4());
        source.enrollments.push(Enrollment {
            student_id: newcomer,
            course_id: course,
            student_name: None,
        });

        let policy = DashboardPolicy::default();
        let rows = assemble_dashboard(&source, &[course], &policy).await.unwrap();
        let overview = DashboardOverview::from_rows(&rows, &policy);

        assert_eq!(overview.student_count, 3);
        // lucia 75%, mateo 0%
        assert!((overview.mean_attendance_rate - 37.5).abs() < 1e-9);
        // lucia 16, mateo 8
        assert!((overview.mean_average_score - 12.0).abs() < 1e-9);
        assert_eq!(overview.band_excellent, 1);
        assert_eq!(overview.band_good, 1);
        assert_eq!(overview.band_low, 1);
        assert_eq!(overview.health_good, 1);
        assert_eq!(overview.health_poor, 1);
    }
}
