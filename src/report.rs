use std::fmt::Write;

use chrono::NaiveDate;

use crate::dashboard::{attendance_health, needs_attention, DashboardOverview};
use crate::models::StudentDashboard;
use crate::policy::DashboardPolicy;

pub fn build_report(
    label: &str,
    generated_on: NaiveDate,
    rows: &[StudentDashboard],
    policy: &DashboardPolicy,
) -> String {
    let overview = DashboardOverview::from_rows(rows, policy);
    let mut output = String::new();

    let _ = writeln!(output, "# Course Dashboard Report");
    let _ = writeln!(output, "Generated for {} on {}", label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Overview");

    if rows.is_empty() {
        let _ = writeln!(output, "No students enrolled in the selected courses.");
        return output;
    }

    let _ = writeln!(output, "- Students: {}", overview.student_count);
    let _ = writeln!(
        output,
        "- Mean attendance rate: {:.1}%",
        overview.mean_attendance_rate
    );
    let _ = writeln!(
        output,
        "- Mean grade average: {:.2} / {}",
        overview.mean_average_score, policy.grades.scale_max
    );
    let _ = writeln!(
        output,
        "- Attendance health: {} excellent, {} good, {} fair, {} poor",
        overview.health_excellent, overview.health_good, overview.health_fair, overview.health_poor
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    let graded = overview.band_excellent + overview.band_good + overview.band_acceptable + overview.band_low;
    if graded == 0 {
        let _ = writeln!(output, "No graded submissions yet.");
    } else {
        let g = &policy.grades;
        let _ = writeln!(output, "- Excellent (>= {}): {}", g.excellent, overview.band_excellent);
        let _ = writeln!(output, "- Good (>= {}): {}", g.good, overview.band_good);
        let _ = writeln!(output, "- Acceptable (>= {}): {}", g.acceptable, overview.band_acceptable);
        let _ = writeln!(output, "- Low (< {}): {}", g.acceptable, overview.band_low);
    }

    let mut flagged: Vec<&StudentDashboard> = rows
        .iter()
        .filter(|row| needs_attention(row, policy))
        .collect();
    flagged.sort_by(|a, b| {
        a.attendance
            .attendance_rate
            .partial_cmp(&b.attendance.attendance_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");
    if flagged.is_empty() {
        let _ = writeln!(output, "No students below the attendance or grade thresholds.");
    } else {
        for row in flagged {
            let _ = writeln!(
                output,
                "- {}: attendance {:.1}% over {} sessions, average {:.2} over {} graded",
                row.student.display_name(),
                row.attendance.attendance_rate,
                row.attendance.total,
                row.grades.average_score,
                row.grades.total_graded
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    let _ = writeln!(
        output,
        "| Student | Present | Late | Absent | Justified | Rate | Health | Graded | Average |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
    for row in rows {
        let health = attendance_health(&row.attendance, policy)
            .map(|h| h.label())
            .unwrap_or("-");
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {:.1}% | {} | {} | {:.2} |",
            row.student.display_name(),
            row.attendance.present,
            row.attendance.late,
            row.attendance.absent,
            row.attendance.justified,
            row.attendance.attendance_rate,
            health,
            row.grades.total_graded,
            row.grades.average_score
        );
    }

    output
}
