use thiserror::Error;

/// Failures of a dashboard assembly. Each one aborts the whole assembly.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to fetch course enrollments")]
    RosterFetchFailed(#[source] anyhow::Error),
    #[error("failed to fetch attendance records")]
    AttendanceFetchFailed(#[source] anyhow::Error),
    #[error("failed to fetch graded submissions")]
    GradeFetchFailed(#[source] anyhow::Error),
}
