//! Derived-statistics computation over loaded gradebook documents.
//!
//! Every function here is pure: it takes already-loaded data and returns a
//! value or a typed error. Arithmetic functions fail closed on an empty
//! divisor set; lookups belong to [`crate::index`] and fail open.

use std::collections::BTreeMap;

use serde::Serialize;

use coach_core::error::{CoachError, Result};
use coach_core::models::{round2, Aluno, Grade, Professor, SchoolDocument, Turma};

/// Section classification threshold in percent used by the fixed query
/// shapes when the caller does not override it.
pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// How many entries the ranking queries return by default.
pub const DEFAULT_TOP_N: usize = 5;

// ── Ranking rows ──────────────────────────────────────────────────────────────

/// One row of the top-students ranking.
#[derive(Debug, Clone, Serialize)]
pub struct StudentStanding {
    pub nome: String,
    pub turma: String,
    pub media_geral: f64,
}

/// One row of the top-professors ranking.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessorStanding {
    pub nome: String,
    pub materia: String,
    pub nota: f64,
    pub turmas: Vec<String>,
}

// ── Focus mode ────────────────────────────────────────────────────────────────

/// Whether a focus query targets sections below or at/above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Weak,
    Strong,
}

impl FocusMode {
    /// Parse the query-surface string form (`"weak"` / `"strong"`).
    pub fn from_str(value: &str) -> Option<FocusMode> {
        match value {
            "weak" => Some(FocusMode::Weak),
            "strong" => Some(FocusMode::Strong),
            _ => None,
        }
    }

    /// Test a percentage against the threshold: weak means strictly
    /// below, strong means at or above.
    pub fn matches(&self, percent: f64, threshold: f64) -> bool {
        match self {
            FocusMode::Weak => percent < threshold,
            FocusMode::Strong => percent >= threshold,
        }
    }
}

// ── GradeAggregator ───────────────────────────────────────────────────────────

/// Stateless collection of grade statistics.
pub struct GradeAggregator;

impl GradeAggregator {
    /// Arithmetic mean of an aluno's notas.
    ///
    /// Fails with [`CoachError::EmptyGradeSet`] when `notas` is empty.
    pub fn student_average(aluno: &Aluno) -> Result<f64> {
        if aluno.notas.is_empty() {
            return Err(CoachError::EmptyGradeSet {
                owner: aluno.nome.clone(),
            });
        }
        let sum: f64 = aluno.notas.values().sum();
        Ok(sum / aluno.notas.len() as f64)
    }

    /// Mean of one materia's nota across every aluno of the turma.
    ///
    /// An aluno lacking the materia key is a data-integrity failure
    /// ([`CoachError::MissingSubject`]), never a silent skip: skipping
    /// would change the numeric result. An empty turma fails with
    /// [`CoachError::EmptyGradeSet`].
    pub fn class_subject_average(turma: &Turma, materia: &str) -> Result<f64> {
        if turma.alunos.is_empty() {
            return Err(CoachError::EmptyGradeSet {
                owner: turma.nome.clone(),
            });
        }
        let mut sum = 0.0;
        for aluno in &turma.alunos {
            let nota = aluno
                .notas
                .get(materia)
                .ok_or_else(|| CoachError::MissingSubject {
                    aluno: aluno.nome.clone(),
                    materia: materia.to_string(),
                })?;
            sum += nota;
        }
        Ok(sum / turma.alunos.len() as f64)
    }

    /// Mean of the per-materia averages over the turma's full curriculum.
    pub fn class_overall_average(turma: &Turma) -> Result<f64> {
        if turma.materias.is_empty() {
            return Err(CoachError::EmptyGradeSet {
                owner: turma.nome.clone(),
            });
        }
        let mut sum = 0.0;
        for materia in &turma.materias {
            sum += Self::class_subject_average(turma, materia)?;
        }
        Ok(sum / turma.materias.len() as f64)
    }

    /// Overall course percentage from the section breakdown: earned points
    /// over possible points across sections with `score_possible > 0`,
    /// scaled to 0..100.
    ///
    /// Returns 0.0 when no section qualifies; an ungraded course is not an
    /// error.
    pub fn course_percentage(grade: &Grade) -> f64 {
        let mut earned = 0.0;
        let mut possible = 0.0;
        for section in &grade.section_breakdown {
            if section.score_possible > 0.0 {
                earned += section.score_earned;
                possible += section.score_possible;
            }
        }
        if possible > 0.0 {
            earned / possible * 100.0
        } else {
            0.0
        }
    }

    /// Share of sections the student attempted, in percent. 0.0 when the
    /// breakdown is empty.
    pub fn completion_rate(grade: &Grade) -> f64 {
        let total = grade.section_breakdown.len();
        if total == 0 {
            return 0.0;
        }
        let attempted = grade
            .section_breakdown
            .iter()
            .filter(|s| s.attempted)
            .count();
        attempted as f64 / total as f64 * 100.0
    }

    /// Display names of sections scoring below `threshold` percent.
    /// Sections without a stored percent count as 0 and are always weak.
    pub fn weak_sections(grade: &Grade, threshold: f64) -> Vec<&str> {
        Self::focus_sections(grade, FocusMode::Weak, threshold)
    }

    /// Display names of sections matching the focus mode against
    /// `threshold` percent.
    pub fn focus_sections(grade: &Grade, mode: FocusMode, threshold: f64) -> Vec<&str> {
        grade
            .section_breakdown
            .iter()
            .filter(|s| mode.matches(s.percent_scaled(), threshold))
            .map(|s| s.display_name())
            .collect()
    }

    /// Rank every aluno across all turmas by overall average, descending.
    ///
    /// The sort is stable, so ties keep snapshot order. Averages are
    /// rounded to two decimals before ranking, matching the report
    /// payloads downstream.
    pub fn top_students(school: &SchoolDocument, n: usize) -> Result<Vec<StudentStanding>> {
        let mut standings = Vec::new();
        for turma in &school.turmas {
            for aluno in &turma.alunos {
                standings.push(StudentStanding {
                    nome: aluno.nome.clone(),
                    turma: turma.nome.clone(),
                    media_geral: round2(Self::student_average(aluno)?),
                });
            }
        }
        standings.sort_by(|a, b| {
            b.media_geral
                .partial_cmp(&a.media_geral)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        standings.truncate(n);
        Ok(standings)
    }

    /// Rank professores by their own nota, descending, stable.
    pub fn top_professors(school: &SchoolDocument, n: usize) -> Vec<ProfessorStanding> {
        let mut ranked: Vec<&Professor> = school.professores.iter().collect();
        ranked.sort_by(|a, b| {
            b.nota
                .partial_cmp(&a.nota)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
            .into_iter()
            .take(n)
            .map(|p| ProfessorStanding {
                nome: p.nome.clone(),
                materia: p.materia.clone(),
                nota: round2(p.nota),
                turmas: p.turmas.clone(),
            })
            .collect()
    }

    /// Mean grade per materia across every aluno of every turma.
    ///
    /// Iterates each aluno's own notas, so a materia taught in only some
    /// turmas still gets an average over the alunos that have it.
    pub fn materia_averages(school: &SchoolDocument) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for turma in &school.turmas {
            for aluno in &turma.alunos {
                for (materia, nota) in &aluno.notas {
                    let entry = totals.entry(materia.clone()).or_insert((0.0, 0));
                    entry.0 += nota;
                    entry.1 += 1;
                }
            }
        }
        totals
            .into_iter()
            .map(|(materia, (sum, count))| (materia, round2(sum / count as f64)))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
