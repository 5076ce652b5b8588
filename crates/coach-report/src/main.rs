mod bootstrap;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use coach_core::cohort::Cohort;
use coach_core::error::Severity;
use coach_core::settings::Settings;
use coach_data::aggregator::FocusMode;
use coach_data::queries::{DatasetPaths, ReportEngine};
use coach_data::stream::ReportEvent;

#[derive(Parser)]
#[command(
    name = "coach-report",
    version,
    about = "Reporting engine over gradebook snapshots"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Every grade on record for one student, by username or email
    Student { key: String },
    /// Every grade on record for one platform user id
    StudentById { user_id: i64 },
    /// One student's grade in one specific course
    CourseGrade { email: String, course_id: String },
    /// One entry per course for a student, zero-filled where absent
    StudentAllCourses { email: String },
    /// Alunos of one turma with notas and averages
    Roster { turma: String },
    /// Names of every turma
    Turmas,
    /// Every professor with materia and turmas
    Professores,
    /// One professor plus the rosters of their turmas
    Professor { name: String },
    /// Top students, per-materia averages and top professors
    Summary,
    /// Per-course averages for one cohort
    CohortGrades {
        #[arg(value_parser = ["PDITA", "PDBD"])]
        cohort: String,
    },
    /// Sections a student should focus on, weak or strong
    FocusAreas {
        key: String,
        #[arg(long, default_value = "weak", value_parser = ["weak", "strong"])]
        mode: String,
        /// Restrict to one course id
        #[arg(long)]
        course: Option<String>,
    },
    /// Two professores side by side
    CompareProfessors { a: String, b: String },
    /// Two alunos of the same turma side by side
    CompareAlunos { turma: String, a: String, b: String },
    /// Two alunos from different turmas side by side
    CompareAcross {
        turma_a: String,
        aluno_a: String,
        turma_b: String,
        aluno_b: String,
    },
    /// Two turmas subject by subject
    CompareTurmas { a: String, b: String },
    /// Stream every grade of every course as NDJSON events
    AllGrades,
    /// Stream the Itabira / Bom Despacho comparison as NDJSON events
    CompareCohorts,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    bootstrap::setup_logging(&cli.settings.log_level)?;

    tracing::debug!("coach-report v{} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = bootstrap::discover_data_dir();
    let grades = cli
        .settings
        .resolve_grades_path(data_dir.as_deref())
        .ok_or_else(|| {
            anyhow!("no grades snapshot found; pass --grades-path or create ./data")
        })?;
    let school = cli
        .settings
        .resolve_school_path(data_dir.as_deref())
        .ok_or_else(|| {
            anyhow!("no school snapshot found; pass --school-path or create ./data")
        })?;

    let engine = ReportEngine::new(DatasetPaths { grades, school });
    if let Err(err) = run(&engine, cli.command, cli.settings.threshold) {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "severity": severity_name(err.severity()),
        });
        println!("{}", payload);
        std::process::exit(1);
    }
    Ok(())
}

fn run(engine: &ReportEngine, command: Command, threshold: f64) -> coach_core::error::Result<()> {
    match command {
        Command::Student { key } => print_json(&engine.student_overview(&key)?),
        Command::StudentById { user_id } => print_json(&engine.student_grades_by_id(user_id)?),
        Command::CourseGrade { email, course_id } => {
            print_json(&engine.student_course_grade(&email, &course_id)?)
        }
        Command::StudentAllCourses { email } => {
            print_json(&engine.student_grades_all_courses(&email)?)
        }
        Command::Roster { turma } => print_json(&engine.class_roster(&turma)?),
        Command::Turmas => print_json(&engine.list_turmas()?),
        Command::Professores => print_json(&engine.list_professores()?),
        Command::Professor { name } => print_json(&engine.professor_overview(&name)?),
        Command::Summary => print_json(&engine.overview_summary()?),
        Command::CohortGrades { cohort } => {
            // The value parser restricts input to the two known codes.
            let cohort = Cohort::from_code(&cohort).unwrap_or(Cohort::Itabira);
            print_json(&engine.cohort_grades(cohort)?)
        }
        Command::FocusAreas { key, mode, course } => {
            let mode = FocusMode::from_str(&mode).unwrap_or(FocusMode::Weak);
            print_json(&engine.focus_areas(&key, mode, course.as_deref(), threshold)?)
        }
        Command::CompareProfessors { a, b } => print_json(&engine.compare_professors(&a, &b)?),
        Command::CompareAlunos { turma, a, b } => {
            print_json(&engine.compare_alunos_in_turma(&turma, &a, &b)?)
        }
        Command::CompareAcross {
            turma_a,
            aluno_a,
            turma_b,
            aluno_b,
        } => print_json(&engine.compare_alunos_across_turmas(&turma_a, &aluno_a, &turma_b, &aluno_b)?),
        Command::CompareTurmas { a, b } => print_json(&engine.compare_turmas(&a, &b)?),
        Command::AllGrades => print_stream(engine.all_grades()),
        Command::CompareCohorts => print_stream(engine.compare_cohorts()),
    }
}

/// Pretty-print one buffered result to stdout.
fn print_json<T: Serialize>(value: &T) -> coach_core::error::Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(anyhow::Error::from)?;
    println!("{}", rendered);
    Ok(())
}

/// Print a stream as NDJSON, one event per line.
fn print_stream(stream: impl Iterator<Item = ReportEvent>) -> coach_core::error::Result<()> {
    for event in stream {
        let line = serde_json::to_string(&event).map_err(anyhow::Error::from)?;
        println!("{}", line);
    }
    Ok(())
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::NotFound => "not_found",
        Severity::InvalidInput => "invalid_input",
        Severity::DataIntegrity => "data_integrity",
        Severity::Internal => "internal",
    }
}
