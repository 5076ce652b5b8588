//! Buffered query surface over the two gradebook snapshots.
//!
//! [`ReportEngine`] is the one entry point the CLI talks to. It holds the
//! resolved dataset paths and reloads from disk on every call, so results
//! always reflect the latest snapshot-refresh output. Methods return fully
//! serialisable payloads or a typed [`CoachError`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use coach_core::cohort::Cohort;
use coach_core::error::{CoachError, EntityKind, Result};
use coach_core::models::{round2, Aluno, CourseDocument, SchoolDocument, Section};

use crate::aggregator::{
    FocusMode, GradeAggregator, ProfessorStanding, StudentStanding, DEFAULT_TOP_N,
};
use crate::comparison::{
    self, AlunoComparison, CrossTurmaComparison, ProfessorComparison, TurmaComparison,
};
use crate::index;
use crate::loader;
use crate::stream::{CohortStream, GradeStream};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Resolved locations of the two dataset files.
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub grades: PathBuf,
    pub school: PathBuf,
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// One course entry of a per-student report. `username` and `email` are
/// absent for zero-filled entries of courses the student never enrolled
/// in.
#[derive(Debug, Clone, Serialize)]
pub struct CourseGradeEntry {
    pub course_id: String,
    pub course_name: String,
    pub calculated_grade: f64,
    pub section_breakdown: Vec<Section>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Every grade on record for one student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentOverview {
    pub username: String,
    pub grades: Vec<CourseGradeEntry>,
}

/// One course entry of a by-id report; identity fields are omitted since
/// the caller already supplied the id.
#[derive(Debug, Clone, Serialize)]
pub struct IdGradeEntry {
    pub course_id: String,
    pub course_name: String,
    pub calculated_grade: f64,
    pub section_breakdown: Vec<Section>,
}

/// Every grade on record for one platform user id. `grades` may be
/// empty; an unknown id is not an error.
#[derive(Debug, Clone, Serialize)]
pub struct StudentGradesById {
    pub student_id: i64,
    pub grades: Vec<IdGradeEntry>,
}

/// One student's grade in one course. `grade` is `None` when the course
/// exists but carries no record for the student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentCourseGrade {
    pub student_email: String,
    pub course_id: String,
    pub course_name: String,
    pub grade: Option<f64>,
    pub section_breakdown: Vec<Section>,
}

/// One aluno of a roster, with the overall average precomputed.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub nome: String,
    pub notas: BTreeMap<String, f64>,
    pub media_geral: f64,
}

/// A turma's full roster.
#[derive(Debug, Clone, Serialize)]
pub struct ClassRoster {
    pub turma: String,
    pub alunos: Vec<RosterEntry>,
    pub materias: Vec<String>,
}

/// A professor entry of the listing, teaching grade omitted.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessorListing {
    pub nome: String,
    pub materia: String,
    pub turmas: Vec<String>,
}

/// One turma as seen from a professor's overview.
#[derive(Debug, Clone, Serialize)]
pub struct TurmaRoster {
    pub alunos: Vec<RosterEntry>,
    pub materias: Vec<String>,
}

/// A professor and the rosters of every turma they teach.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessorOverview {
    pub professor: String,
    pub materia: String,
    pub nota_professor: f64,
    pub turmas: BTreeMap<String, TurmaRoster>,
}

/// Landing-page style aggregate over the whole school snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewSummary {
    pub generated_at: DateTime<Utc>,
    pub top_students: Vec<StudentStanding>,
    pub materia_stats: BTreeMap<String, f64>,
    pub top_professors: Vec<ProfessorStanding>,
}

/// Per-course aggregate for one cohort, keyed by display name.
#[derive(Debug, Clone, Serialize)]
pub struct CourseCohortSummary {
    pub course_name: String,
    pub average_grade: f64,
    pub student_count: usize,
}

/// All courses a cohort's students appear in.
#[derive(Debug, Clone, Serialize)]
pub struct CohortGrades {
    pub cohort: String,
    pub grades: Vec<CourseCohortSummary>,
}

/// Sections of one course a student should focus on.
#[derive(Debug, Clone, Serialize)]
pub struct FocusArea {
    pub course_id: String,
    pub course_name: String,
    pub calculated_grade: f64,
    pub target_sections: Vec<String>,
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Stateless facade over loader, index, aggregator, comparison and stream.
pub struct ReportEngine {
    paths: DatasetPaths,
}

impl ReportEngine {
    pub fn new(paths: DatasetPaths) -> Self {
        ReportEngine { paths }
    }

    fn course_doc(&self) -> Result<CourseDocument> {
        loader::load_course_document(&self.paths.grades)
    }

    fn school_doc(&self) -> Result<SchoolDocument> {
        loader::load_school_document(&self.paths.school)
    }

    // ── Course snapshot queries ───────────────────────────────────────────

    /// All grades on record for one student, looked up by username or by
    /// email (reduced to its local part).
    pub fn student_overview(&self, username_or_email: &str) -> Result<StudentOverview> {
        let username = resolve_username(username_or_email)?;
        let doc = self.course_doc()?;

        let grades: Vec<CourseGradeEntry> = index::grades_for_username(&doc, username)
            .into_iter()
            .map(|(course_id, record, grade)| CourseGradeEntry {
                course_id: course_id.to_string(),
                course_name: record.display_name(course_id).to_string(),
                calculated_grade: grade.calculated_grade,
                section_breakdown: grade.section_breakdown.clone(),
                user_id: grade.user_id,
                username: Some(grade.username.clone()),
                email: Some(grade.email.clone()),
            })
            .collect();

        if grades.is_empty() {
            return Err(CoachError::EntityNotFound {
                kind: EntityKind::Aluno,
                name: username.to_string(),
            });
        }
        Ok(StudentOverview {
            username: username.to_string(),
            grades,
        })
    }

    /// All grades on record for one platform user id. An id with no
    /// records yields an empty list, not an error.
    pub fn student_grades_by_id(&self, user_id: i64) -> Result<StudentGradesById> {
        let doc = self.course_doc()?;
        let grades = index::grades_for_user_id(&doc, user_id)
            .into_iter()
            .map(|(course_id, record, grade)| IdGradeEntry {
                course_id: course_id.to_string(),
                course_name: record.display_name(course_id).to_string(),
                calculated_grade: grade.calculated_grade,
                section_breakdown: grade.section_breakdown.clone(),
            })
            .collect();
        Ok(StudentGradesById {
            student_id: user_id,
            grades,
        })
    }

    /// One student's grade in one specific course. A student absent from
    /// an existing course is an empty result, not an error.
    pub fn student_course_grade(&self, email: &str, course_id: &str) -> Result<StudentCourseGrade> {
        let doc = self.course_doc()?;
        let record = index::find_course(&doc, course_id).ok_or_else(|| {
            CoachError::EntityNotFound {
                kind: EntityKind::Course,
                name: course_id.to_string(),
            }
        })?;

        let course_name = record.display_name(course_id).to_string();
        match index::find_grade_by_email(record, email) {
            Some(grade) => Ok(StudentCourseGrade {
                student_email: email.to_string(),
                course_id: course_id.to_string(),
                course_name,
                grade: Some(grade.calculated_grade),
                section_breakdown: grade.section_breakdown.clone(),
            }),
            None => Ok(StudentCourseGrade {
                student_email: email.to_string(),
                course_id: course_id.to_string(),
                course_name,
                grade: None,
                section_breakdown: Vec::new(),
            }),
        }
    }

    /// One entry per course for a student, zero-filled where the student
    /// has no record, so every course always appears.
    pub fn student_grades_all_courses(&self, email: &str) -> Result<Vec<CourseGradeEntry>> {
        let doc = self.course_doc()?;
        let mut entries = Vec::with_capacity(doc.courses.len());
        for (course_id, record) in &doc.courses {
            let course_name = record.display_name(course_id).to_string();
            match index::find_grade_by_email(record, email) {
                Some(grade) => entries.push(CourseGradeEntry {
                    course_id: course_id.clone(),
                    course_name,
                    calculated_grade: grade.calculated_grade,
                    section_breakdown: grade.section_breakdown.clone(),
                    user_id: grade.user_id,
                    username: Some(grade.username.clone()),
                    email: Some(grade.email.clone()),
                }),
                None => entries.push(CourseGradeEntry {
                    course_id: course_id.clone(),
                    course_name,
                    calculated_grade: 0.0,
                    section_breakdown: Vec::new(),
                    user_id: None,
                    username: None,
                    email: None,
                }),
            }
        }
        Ok(entries)
    }

    /// Per-course average grade and distinct student count for one
    /// cohort, keyed by course display name. Grade entries with an empty
    /// username or no user id are skipped.
    pub fn cohort_grades(&self, cohort: Cohort) -> Result<CohortGrades> {
        let doc = self.course_doc()?;
        let mut per_course: BTreeMap<String, (Vec<f64>, BTreeSet<i64>)> = BTreeMap::new();

        for (course_id, record) in &doc.courses {
            let course_name = record.display_name(course_id);
            for grade in &record.grades {
                let username = grade.username.to_lowercase();
                let Some(user_id) = grade.user_id else {
                    warn!(
                        "Skipping grade with no user id in {} (username={})",
                        course_id, grade.username
                    );
                    continue;
                };
                if username.is_empty() {
                    warn!("Skipping grade with empty username in {}", course_id);
                    continue;
                }
                if Cohort::assign(&username, user_id) != cohort {
                    continue;
                }
                let entry = per_course
                    .entry(course_name.to_string())
                    .or_insert_with(|| (Vec::new(), BTreeSet::new()));
                entry.0.push(grade.calculated_grade);
                entry.1.insert(user_id);
            }
        }

        let grades = per_course
            .into_iter()
            .map(|(course_name, (grades, students))| CourseCohortSummary {
                course_name,
                average_grade: round2(grades.iter().sum::<f64>() / grades.len() as f64),
                student_count: students.len(),
            })
            .collect();
        Ok(CohortGrades {
            cohort: cohort.code().to_string(),
            grades,
        })
    }

    /// Per-course lists of sections a student should focus on, filtered
    /// by weak/strong mode against the threshold. Courses whose overall
    /// grade does not itself match the mode are left out.
    pub fn focus_areas(
        &self,
        username_or_email: &str,
        mode: FocusMode,
        course_filter: Option<&str>,
        threshold: f64,
    ) -> Result<Vec<FocusArea>> {
        let overview = self.student_overview(username_or_email)?;
        let mut areas = Vec::new();
        for entry in overview.grades {
            if let Some(filter) = course_filter {
                if entry.course_id != filter {
                    continue;
                }
            }
            if !mode.matches(entry.calculated_grade, threshold) {
                continue;
            }
            let target_sections: Vec<String> = entry
                .section_breakdown
                .iter()
                .filter(|s| mode.matches(s.percent_scaled(), threshold))
                .map(|s| s.display_name().to_string())
                .collect();
            if target_sections.is_empty() {
                continue;
            }
            areas.push(FocusArea {
                course_id: entry.course_id,
                course_name: entry.course_name,
                calculated_grade: entry.calculated_grade,
                target_sections,
            });
        }
        debug!("Found {} focus areas", areas.len());
        Ok(areas)
    }

    // ── School snapshot queries ───────────────────────────────────────────

    /// Names of every turma in the snapshot.
    pub fn list_turmas(&self) -> Result<Vec<String>> {
        let school = self.school_doc()?;
        Ok(school.turmas.into_iter().map(|t| t.nome).collect())
    }

    /// Every professor with their materia and turmas.
    pub fn list_professores(&self) -> Result<Vec<ProfessorListing>> {
        let school = self.school_doc()?;
        Ok(school
            .professores
            .into_iter()
            .map(|p| ProfessorListing {
                nome: p.nome,
                materia: p.materia,
                turmas: p.turmas,
            })
            .collect())
    }

    /// One turma's alunos with notas and overall averages.
    pub fn class_roster(&self, turma_name: &str) -> Result<ClassRoster> {
        let school = self.school_doc()?;
        let turma = index::find_turma(&school, turma_name).ok_or_else(|| {
            CoachError::EntityNotFound {
                kind: EntityKind::Turma,
                name: turma_name.to_string(),
            }
        })?;
        Ok(ClassRoster {
            turma: turma.nome.clone(),
            alunos: roster_entries(&turma.alunos)?,
            materias: turma.materias.clone(),
        })
    }

    /// A professor plus the rosters of the turmas they teach. Turma
    /// references without a matching turma are skipped.
    pub fn professor_overview(&self, name: &str) -> Result<ProfessorOverview> {
        let school = self.school_doc()?;
        let professor = index::find_professor(&school, name).ok_or_else(|| {
            CoachError::EntityNotFound {
                kind: EntityKind::Professor,
                name: name.to_string(),
            }
        })?;

        let mut turmas = BTreeMap::new();
        for turma_name in &professor.turmas {
            let Some(turma) = index::find_turma(&school, turma_name) else {
                debug!("Professor {} references unknown turma {}", name, turma_name);
                continue;
            };
            turmas.insert(
                turma_name.clone(),
                TurmaRoster {
                    alunos: roster_entries(&turma.alunos)?,
                    materias: turma.materias.clone(),
                },
            );
        }
        Ok(ProfessorOverview {
            professor: professor.nome.clone(),
            materia: professor.materia.clone(),
            nota_professor: professor.nota,
            turmas,
        })
    }

    /// Top students, per-materia averages and top professors across the
    /// whole school.
    pub fn overview_summary(&self) -> Result<OverviewSummary> {
        let school = self.school_doc()?;
        Ok(OverviewSummary {
            generated_at: Utc::now(),
            top_students: GradeAggregator::top_students(&school, DEFAULT_TOP_N)?,
            materia_stats: GradeAggregator::materia_averages(&school),
            top_professors: GradeAggregator::top_professors(&school, DEFAULT_TOP_N),
        })
    }

    // ── Comparisons ───────────────────────────────────────────────────────

    pub fn compare_professors(&self, a: &str, b: &str) -> Result<ProfessorComparison> {
        let school = self.school_doc()?;
        comparison::compare_professors(&school, a, b)
    }

    pub fn compare_alunos_in_turma(
        &self,
        turma: &str,
        a: &str,
        b: &str,
    ) -> Result<AlunoComparison> {
        let school = self.school_doc()?;
        comparison::compare_alunos_in_turma(&school, turma, a, b)
    }

    pub fn compare_alunos_across_turmas(
        &self,
        turma_a: &str,
        aluno_a: &str,
        turma_b: &str,
        aluno_b: &str,
    ) -> Result<CrossTurmaComparison> {
        let school = self.school_doc()?;
        comparison::compare_alunos_across_turmas(&school, turma_a, aluno_a, turma_b, aluno_b)
    }

    pub fn compare_turmas(&self, a: &str, b: &str) -> Result<TurmaComparison> {
        let school = self.school_doc()?;
        comparison::compare_turmas(&school, a, b)
    }

    // ── Streams ───────────────────────────────────────────────────────────

    /// Stream every grade of every course. A load failure becomes the
    /// stream's single `Error` event rather than an early return.
    pub fn all_grades(&self) -> GradeStream {
        match self.course_doc() {
            Ok(doc) => GradeStream::new(doc),
            Err(err) => GradeStream::from_error(&err),
        }
    }

    /// Stream the Itabira / Bom Despacho comparison.
    pub fn compare_cohorts(&self) -> CohortStream {
        match self.course_doc() {
            Ok(doc) => CohortStream::new(doc),
            Err(err) => CohortStream::from_error(&err),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Reduce an email to its local part; a key without `@` is already a
/// username.
fn resolve_username(username_or_email: &str) -> Result<&str> {
    match username_or_email.split_once('@') {
        Some(("", _)) => Err(CoachError::InvalidEmail(username_or_email.to_string())),
        Some((local, _)) => Ok(local),
        None => Ok(username_or_email),
    }
}

fn roster_entries(alunos: &[Aluno]) -> Result<Vec<RosterEntry>> {
    alunos
        .iter()
        .map(|aluno| {
            Ok(RosterEntry {
                nome: aluno.nome.clone(),
                notas: aluno.notas.clone(),
                media_geral: round2(GradeAggregator::student_average(aluno)?),
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
