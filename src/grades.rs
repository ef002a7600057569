use std::collections::HashMap;

use crate::models::{GradeEvent, GradeSummary, RosterEntry, StudentId};
use crate::policy::{GradeBand, GradePolicy};

/// One summary per roster student, in roster order. Band edges belong to the
/// higher band.
///
/// Scores outside `0..=scale_max` (or not finite) are counted as zero, both in
/// the low band and in the average, so `average_score` equals the mean of the
/// raw scores only when every input score is in range.
pub fn summarize_grades(
    roster: &[RosterEntry],
    events: &[GradeEvent],
    policy: &GradePolicy,
) -> Vec<GradeSummary> {
    let mut totals: HashMap<StudentId, (GradeSummary, f64)> = roster
        .iter()
        .map(|entry| (entry.student_id, (GradeSummary::empty(entry.student_id), 0.0)))
        .collect();

    for event in events {
        let Some((summary, sum)) = totals.get_mut(&event.student_id) else {
            continue;
        };

        let score = policy.clamp(event.score);
        match policy.band(score) {
            GradeBand::Excellent => summary.band_excellent += 1,
            GradeBand::Good => summary.band_good += 1,
            GradeBand::Acceptable => summary.band_acceptable += 1,
            GradeBand::Low => summary.band_low += 1,
        }
        summary.total_graded += 1;
        *sum += score;
    }

    roster
        .iter()
        .filter_map(|entry| totals.remove(&entry.student_id))
        .map(|(mut summary, sum)| {
            summary.average_score = if summary.total_graded == 0 {
                0.0
            } else {
                sum / summary.total_graded as f64
            };
            summary
        })
        .collect()
}
