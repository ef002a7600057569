use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod attendance;
mod config;
mod dashboard;
mod db;
mod error;
mod grades;
mod models;
mod policy;
mod report;
mod roster;

use crate::config::Config;
use crate::dashboard::{attendance_health, assemble_dashboard, DashboardOverview};
use crate::models::StudentDashboard;
use crate::policy::DashboardPolicy;

#[derive(Parser)]
#[command(name = "school-dashboard")]
#[command(about = "Per-student attendance and grade dashboards for school courses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Print the per-student dashboard for one or more courses
    Dashboard {
        /// Course code, repeatable
        #[arg(long = "course", required = true)]
        courses: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// JSON file overriding grade and attendance thresholds
        #[arg(long)]
        policy: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long = "course", required = true)]
        courses: Vec<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct CsvRow<'a> {
    student_id: String,
    student_name: &'a str,
    present: usize,
    late: usize,
    absent: usize,
    justified: usize,
    total_sessions: usize,
    attendance_rate: f64,
    band_excellent: usize,
    band_good: usize,
    band_acceptable: usize,
    band_low: usize,
    total_graded: usize,
    average_score: f64,
}

fn load_policy(path: Option<&PathBuf>) -> anyhow::Result<DashboardPolicy> {
    match path {
        Some(path) => DashboardPolicy::load(path),
        None => Ok(DashboardPolicy::default()),
    }
}

fn print_text(rows: &[StudentDashboard], policy: &DashboardPolicy) {
    if rows.is_empty() {
        println!("No students enrolled in the selected courses.");
        return;
    }

    println!(
        "{:<28} {:>4} {:>4} {:>4} {:>4} {:>7} {:<9} {:>6} {:>7}",
        "student", "P", "L", "A", "J", "rate", "health", "graded", "avg"
    );
    for row in rows {
        let health = attendance_health(&row.attendance, policy)
            .map(|h| h.label())
            .unwrap_or("-");
        println!(
            "{:<28} {:>4} {:>4} {:>4} {:>4} {:>6.1}% {:<9} {:>6} {:>7.2}",
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

    let overview = DashboardOverview::from_rows(rows, policy);
    println!();
    println!(
        "{} students, mean attendance {:.1}%, mean average {:.2}",
        overview.student_count, overview.mean_attendance_rate, overview.mean_average_score
    );
}

fn write_csv(rows: &[StudentDashboard]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    for row in rows {
        let name = row.student.student_name.as_deref().unwrap_or("");
        writer.serialize(CsvRow {
            student_id: row.student.student_id.to_string(),
            student_name: name,
            present: row.attendance.present,
            late: row.attendance.late,
            absent: row.attendance.absent,
            justified: row.attendance.justified,
            total_sessions: row.attendance.total,
            attendance_rate: row.attendance.attendance_rate,
            band_excellent: row.grades.band_excellent,
            band_good: row.grades.band_good,
            band_acceptable: row.grades.band_acceptable,
            band_low: row.grades.band_low,
            total_graded: row.grades.total_graded,
            average_score: row.grades.average_score,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Dashboard {
            courses,
            format,
            policy,
        } => {
            let policy = load_policy(policy.as_ref())?;
            let course_ids = db::resolve_course_codes(&pool, &courses).await?;
            let source = db::PgSource::new(pool.clone(), policy.grades.scale_max);
            let rows = assemble_dashboard(&source, &course_ids, &policy).await?;

            match format {
                OutputFormat::Text => print_text(&rows, &policy),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Csv => write_csv(&rows)?,
            }
        }
        Commands::Report {
            courses,
            out,
            policy,
        } => {
            let policy = load_policy(policy.as_ref())?;
            let course_ids = db::resolve_course_codes(&pool, &courses).await?;
            let source = db::PgSource::new(pool.clone(), policy.grades.scale_max);
            let rows = assemble_dashboard(&source, &course_ids, &policy).await?;

            let label = courses.join(", ");
            let report = report::build_report(
                &label,
                chrono::Local::now().date_naive(),
                &rows,
                &policy,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(students = rows.len(), "report generated");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
