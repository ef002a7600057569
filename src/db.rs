use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dashboard::DashboardSource;
use crate::models::{AttendanceEvent, AttendanceStatus, CourseId, Enrollment, GradeEvent, StudentId};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let teacher_id = Uuid::parse_str("8b0f3c2e-5d4a-4b7e-9a61-2f0c6d1e7a90")?;
    let lucia = Uuid::parse_str("4f2a8c61-7b3e-4d09-a5c1-9e8d2f6b3a17")?;
    let mateo = Uuid::parse_str("91c7e0b4-2d5f-4a86-b3e9-0f4c7a1d5e28")?;
    let camila = Uuid::parse_str("c8e3b5d7-6a1f-4e42-9d70-3b2a8f5c1e94")?;
    let nora = Uuid::parse_str("6e1b9d44-0f3a-4c55-b2d8-91a7e3c5f012")?;

    let profiles = vec![
        (teacher_id, "marta.ruiz@lacampina.edu", "Marta", "Ruiz", "teacher"),
        (lucia, "lucia.fernandez@lacampina.edu", "Lucia", "Fernandez", "student"),
        (mateo, "mateo.rojas@lacampina.edu", "Mateo", "Rojas", "student"),
        (camila, "camila.vargas@lacampina.edu", "Camila", "Vargas", "student"),
        (nora, "nora.quispe@lacampina.edu", "Nora", "Quispe", "student"),
    ];

    for (id, email, first_name, last_name, role) in profiles {
        sqlx::query(
            r#"
            INSERT INTO campus.profiles (id, email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .execute(pool)
        .await?;
    }

    let math = Uuid::parse_str("a1c4e7f0-1111-4a2b-8c3d-5e6f7a8b9c01")?;
    let history = Uuid::parse_str("b2d5f8a1-2222-4b3c-9d4e-6f7a8b9c0d12")?;

    for (id, code, name) in [
        (math, "MAT-101", "Matemáticas I"),
        (history, "HIS-101", "Historia Universal"),
    ] {
        sqlx::query(
            r#"
            INSERT INTO campus.courses (id, name, code, teacher_id, academic_year, semester)
            VALUES ($1, $2, $3, $4, '2026', '1')
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, code = EXCLUDED.code
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(code)
        .bind(teacher_id)
        .execute(pool)
        .await?;
    }

    // Lucia takes both courses.
    let enrollments = [
        (math, lucia),
        (history, lucia),
        (math, mateo),
        (history, camila),
        (math, nora),
    ];

    for (course_id, student_id) in enrollments {
        sqlx::query(
            r#"
            INSERT INTO campus.course_enrollments (id, course_id, student_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_id, student_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(student_id)
        .execute(pool)
        .await?;
    }

    let sessions = [
        NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?,
        NaiveDate::from_ymd_opt(2026, 3, 4).context("invalid date")?,
        NaiveDate::from_ymd_opt(2026, 3, 9).context("invalid date")?,
        NaiveDate::from_ymd_opt(2026, 3, 11).context("invalid date")?,
    ];
    let attendance = [
        (math, lucia, ["present", "present", "late", "absent"]),
        (history, lucia, ["present", "present", "present", "present"]),
        (math, mateo, ["absent", "excused", "absent", "present"]),
        (history, camila, ["present", "late", "present", "present"]),
    ];

    for (course_id, student_id, statuses) in attendance {
        for (date, status) in sessions.iter().zip(statuses) {
            sqlx::query(
                r#"
                INSERT INTO campus.attendance (id, course_id, student_id, date, status)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (course_id, student_id, date) DO UPDATE SET status = EXCLUDED.status
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(course_id)
            .bind(student_id)
            .bind(date)
            .bind(status)
            .execute(pool)
            .await?;
        }
    }

    let quiz = Uuid::parse_str("c3e6a9b2-3333-4c4d-8e5f-7a8b9c0d1e23")?;
    let project = Uuid::parse_str("d4f7b0c3-4444-4d5e-9f6a-8b9c0d1e2f34")?;
    let essay = Uuid::parse_str("e5a8c1d4-5555-4e6f-8a7b-9c0d1e2f3a45")?;

    for (id, course_id, title, max_score) in [
        (quiz, math, "Quiz 1: fracciones", 20.0_f64),
        (project, math, "Proyecto de geometría", 100.0),
        (essay, history, "Ensayo: Revolución Francesa", 20.0),
    ] {
        sqlx::query(
            r#"
            INSERT INTO campus.assignments (id, course_id, title, max_score, is_published)
            VALUES ($1, $2, $3, $4::float8::numeric, TRUE)
            ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, max_score = EXCLUDED.max_score
            "#,
        )
        .bind(id)
        .bind(course_id)
        .bind(title)
        .bind(max_score)
        .execute(pool)
        .await?;
    }

    // Scores are stored on each assignment's own scale. Camila's essay is not graded yet.
    let submissions: [(Uuid, Uuid, Option<f64>); 7] = [
        (quiz, lucia, Some(18.0)),
        (project, lucia, Some(70.0)),
        (essay, lucia, Some(15.5)),
        (quiz, mateo, Some(9.0)),
        (project, mateo, Some(52.0)),
        (quiz, nora, Some(11.0)),
        (essay, camila, None),
    ];

    for (assignment_id, student_id, score) in submissions {
        sqlx::query(
            r#"
            INSERT INTO campus.assignment_submissions
            (id, assignment_id, student_id, score, graded_at)
            VALUES ($1, $2, $3, $4::float8::numeric, CASE WHEN $4 IS NULL THEN NULL ELSE now() END)
            ON CONFLICT (assignment_id, student_id) DO UPDATE
            SET score = EXCLUDED.score, graded_at = EXCLUDED.graded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assignment_id)
        .bind(student_id)
        .bind(score)
        .execute(pool)
        .await?;
    }

    info!("seed data written");
    Ok(())
}

/// Maps course codes to ids. Every code must exist.
pub async fn resolve_course_codes(pool: &PgPool, codes: &[String]) -> anyhow::Result<Vec<CourseId>> {
    let rows = sqlx::query("SELECT id, code FROM campus.courses WHERE code = ANY($1)")
        .bind(codes.to_vec())
        .fetch_all(pool)
        .await
        .context("failed to look up courses")?;

    let mut ids = Vec::with_capacity(codes.len());
    let mut missing = Vec::new();

    for code in codes {
        match rows.iter().find(|row| row.get::<String, _>("code") == *code) {
            Some(row) => ids.push(CourseId(row.get("id"))),
            None => missing.push(code.as_str()),
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("unknown course code(s): {}", missing.join(", "));
    }

    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Postgres-backed dashboard source. Each capability is a single batched query.
pub struct PgSource {
    pool: PgPool,
    scale_max: f64,
}

impl PgSource {
    /// Submission scores are rescaled from each assignment's `max_score` onto `0..=scale_max`.
    pub fn new(pool: PgPool, scale_max: f64) -> Self {
        Self { pool, scale_max }
    }
}

/// Rescales a stored score onto `0..=scale_max`. Extra credit above
/// `max_score` is capped at the top of the scale.
pub fn normalize_score(score: f64, max_score: f64, scale_max: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    (score / max_score * scale_max).clamp(0.0, scale_max)
}

fn uuids<T: Copy>(ids: &[T], inner: impl Fn(T) -> Uuid) -> Vec<Uuid> {
    ids.iter().map(|&id| inner(id)).collect()
}

fn full_name(first: Option<String>, last: Option<String>) -> Option<String> {
    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(name), None) | (None, Some(name)) => Some(name),
        (None, None) => None,
    }
}

#[async_trait]
impl DashboardSource for PgSource {
    async fn fetch_enrollments(&self, course_ids: &[CourseId]) -> anyhow::Result<Vec<Enrollment>> {
        let rows = sqlx::query(
            "SELECT e.student_id, e.course_id, p.first_name, p.last_name \
             FROM campus.course_enrollments e \
             LEFT JOIN campus.profiles p ON p.id = e.student_id \
             WHERE e.course_id = ANY($1)",
        )
        .bind(uuids(course_ids, |c| c.0))
        .fetch_all(&self.pool)
        .await?;

        let enrollments: Vec<Enrollment> = rows
            .into_iter()
            .map(|row| Enrollment {
                student_id: StudentId(row.get("student_id")),
                course_id: CourseId(row.get("course_id")),
                student_name: full_name(row.get("first_name"), row.get("last_name")),
            })
            .collect();

        debug!(rows = enrollments.len(), "enrollments loaded");
        Ok(enrollments)
    }

    async fn fetch_attendance(
        &self,
        student_ids: &[StudentId],
        course_ids: &[CourseId],
    ) -> anyhow::Result<Vec<AttendanceEvent>> {
        let rows = sqlx::query(
            "SELECT student_id, status FROM campus.attendance \
             WHERE student_id = ANY($1) AND course_id = ANY($2)",
        )
        .bind(uuids(student_ids, |s| s.0))
        .bind(uuids(course_ids, |c| c.0))
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("status");
            let status: AttendanceStatus = raw
                .parse()
                .context("attendance row has an unexpected status")?;
            events.push(AttendanceEvent {
                student_id: StudentId(row.get("student_id")),
                status,
            });
        }

        Ok(events)
    }

    async fn fetch_grades(
        &self,
        student_ids: &[StudentId],
        course_ids: &[CourseId],
    ) -> anyhow::Result<Vec<GradeEvent>> {
        let rows = sqlx::query(
            "SELECT s.student_id, s.score::float8 AS score, a.max_score::float8 AS max_score \
             FROM campus.assignment_submissions s \
             JOIN campus.assignments a ON a.id = s.assignment_id \
             WHERE s.student_id = ANY($1) AND a.course_id = ANY($2) \
             AND s.score IS NOT NULL AND a.max_score > 0",
        )
        .bind(uuids(student_ids, |s| s.0))
        .bind(uuids(course_ids, |c| c.0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GradeEvent {
                student_id: StudentId(row.get("student_id")),
                score: normalize_score(row.get("score"), row.get("max_score"), self.scale_max),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_available_name_parts() {
        assert_eq!(
            full_name(Some("Lucia".into()), Some("Fernandez".into())).as_deref(),
            Some("Lucia Fernandez")
        );
        assert_eq!(full_name(None, Some("Fernandez".into())).as_deref(), Some("Fernandez"));
        assert_eq!(full_name(None, None), None);
    }

    #[test]
    fn normalizes_scores_onto_the_grade_scale() {
        assert_eq!(normalize_score(100.0, 100.0, 20.0), 20.0);
        assert_eq!(normalize_score(0.0, 100.0, 20.0), 0.0);
        assert!((normalize_score(70.0, 100.0, 20.0) - 14.0).abs() < 1e-9);
        assert!((normalize_score(15.5, 20.0, 20.0) - 15.5).abs() < 1e-9);
    }

    #[test]
    fn extra_credit_is_capped_at_scale_max() {
        assert_eq!(normalize_score(105.0, 100.0, 20.0), 20.0);

        let student_id = StudentId(Uuid::new_v4());
        let roster = vec![crate::models::RosterEntry {
            student_id,
            student_name: None,
            course_ids: vec![CourseId(Uuid::nil())],
        }];
        let events: Vec<GradeEvent> = [(105.0, 100.0), (95.0, 100.0)]
            .iter()
            .map(|&(score, max)| GradeEvent {
                student_id,
                score: normalize_score(score, max, 20.0),
            })
            .collect();

        let summary = &crate::grades::summarize_grades(
            &roster,
            &events,
            &crate::policy::GradePolicy::default(),
        )[0];
        assert_eq!(summary.band_excellent, 2);
        assert_eq!(summary.band_low, 0);
        assert!((summary.average_score - 19.5).abs() < 1e-9);
    }
}
