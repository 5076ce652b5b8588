//! Pairwise comparisons between professores, alunos and turmas.
//!
//! Each comparison resolves both entities first and never computes a
//! partial result: one missing side fails the whole operation. Output
//! structures are keyed by the entities' display names (flattened maps)
//! so that swapping the arguments only swaps which key holds which stats.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use coach_core::error::{CoachError, Result};
use coach_core::models::{round2, SchoolDocument};

use crate::aggregator::GradeAggregator;
use crate::index::{find_aluno, find_professor, find_turma};

// ── Professor comparison ──────────────────────────────────────────────────────

/// One turma's slice of a professor comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurmaSlice {
    pub students: usize,
    pub average_grade: f64,
}

/// One professor's side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessorSide {
    pub materia: String,
    pub nota_professor: f64,
    pub turmas: BTreeMap<String, TurmaSlice>,
    /// Pooled mean over every underlying student grade, not an
    /// average-of-averages: turmas of different sizes weigh accordingly.
    pub average_grade: f64,
    pub student_count: usize,
}

/// Two professores side by side, keyed by name.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessorComparison {
    #[serde(flatten)]
    pub sides: BTreeMap<String, ProfessorSide>,
}

/// Compare two professores over the turmas they teach.
///
/// Turma references with no matching turma are skipped silently (they are
/// weak references by contract). Within a found turma, a missing materia
/// key on any aluno is fatal.
pub fn compare_professors(
    school: &SchoolDocument,
    a: &str,
    b: &str,
) -> Result<ProfessorComparison> {
    let (prof_a, prof_b) = match (find_professor(school, a), find_professor(school, b)) {
        (Some(pa), Some(pb)) => (pa, pb),
        _ => {
            return Err(CoachError::ComparisonSideMissing {
                a: a.to_string(),
                b: b.to_string(),
            })
        }
    };

    let mut sides = BTreeMap::new();
    for prof in [prof_a, prof_b] {
        let mut turmas = BTreeMap::new();
        let mut pooled: Vec<f64> = Vec::new();

        for turma_name in &prof.turmas {
            let Some(turma) = find_turma(school, turma_name) else {
                debug!("Professor {} references unknown turma {}", prof.nome, turma_name);
                continue;
            };
            let mut grades = Vec::with_capacity(turma.alunos.len());
            for aluno in &turma.alunos {
                let nota = aluno.notas.get(&prof.materia).ok_or_else(|| {
                    CoachError::MissingSubject {
                        aluno: aluno.nome.clone(),
                        materia: prof.materia.clone(),
                    }
                })?;
                grades.push(*nota);
            }
            let average = if grades.is_empty() {
                0.0
            } else {
                round2(grades.iter().sum::<f64>() / grades.len() as f64)
            };
            turmas.insert(
                turma_name.clone(),
                TurmaSlice {
                    students: turma.alunos.len(),
                    average_grade: average,
                },
            );
            pooled.extend(grades);
        }

        let average_grade = if pooled.is_empty() {
            0.0
        } else {
            round2(pooled.iter().sum::<f64>() / pooled.len() as f64)
        };
        sides.insert(
            prof.nome.clone(),
            ProfessorSide {
                materia: prof.materia.clone(),
                nota_professor: prof.nota,
                turmas,
                average_grade,
                student_count: pooled.len(),
            },
        );
    }

    Ok(ProfessorComparison { sides })
}

// ── Aluno comparisons ─────────────────────────────────────────────────────────

/// One aluno's side of a comparison: their notas and overall average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlunoSide {
    pub notas: BTreeMap<String, f64>,
    pub media_geral: f64,
}

/// Two alunos of the same turma side by side, keyed by name.
#[derive(Debug, Clone, Serialize)]
pub struct AlunoComparison {
    pub turma: String,
    #[serde(flatten)]
    pub sides: BTreeMap<String, AlunoSide>,
    pub materias: Vec<String>,
}

/// Compare two alunos within one turma.
pub fn compare_alunos_in_turma(
    school: &SchoolDocument,
    turma_name: &str,
    a: &str,
    b: &str,
) -> Result<AlunoComparison> {
    let turma = find_turma(school, turma_name).ok_or_else(|| CoachError::EntityNotFound {
        kind: coach_core::error::EntityKind::Turma,
        name: turma_name.to_string(),
    })?;

    let (aluno_a, aluno_b) = match (find_aluno(turma, a), find_aluno(turma, b)) {
        (Some(aa), Some(ab)) => (aa, ab),
        _ => {
            return Err(CoachError::ComparisonSideMissing {
                a: a.to_string(),
                b: b.to_string(),
            })
        }
    };

    let mut sides = BTreeMap::new();
    for aluno in [aluno_a, aluno_b] {
        sides.insert(
            aluno.nome.clone(),
            AlunoSide {
                notas: aluno.notas.clone(),
                media_geral: round2(GradeAggregator::student_average(aluno)?),
            },
        );
    }

    Ok(AlunoComparison {
        turma: turma_name.to_string(),
        sides,
        materias: turma.materias.clone(),
    })
}

/// One side of a cross-turma comparison, keyed by turma name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTurmaSide {
    pub aluno: String,
    pub notas: BTreeMap<String, f64>,
    pub media_geral: f64,
}

/// Two alunos from different turmas side by side, keyed by turma name.
/// `materias` is taken from the first turma.
#[derive(Debug, Clone, Serialize)]
pub struct CrossTurmaComparison {
    #[serde(flatten)]
    pub sides: BTreeMap<String, CrossTurmaSide>,
    pub materias: Vec<String>,
}

/// Compare two alunos living in two different turmas.
pub fn compare_alunos_across_turmas(
    school: &SchoolDocument,
    turma_a: &str,
    aluno_a: &str,
    turma_b: &str,
    aluno_b: &str,
) -> Result<CrossTurmaComparison> {
    let (ta, tb) = match (find_turma(school, turma_a), find_turma(school, turma_b)) {
        (Some(ta), Some(tb)) => (ta, tb),
        _ => {
            return Err(CoachError::ComparisonSideMissing {
                a: turma_a.to_string(),
                b: turma_b.to_string(),
            })
        }
    };
    let (aa, ab) = match (find_aluno(ta, aluno_a), find_aluno(tb, aluno_b)) {
        (Some(aa), Some(ab)) => (aa, ab),
        _ => {
            return Err(CoachError::ComparisonSideMissing {
                a: aluno_a.to_string(),
                b: aluno_b.to_string(),
            })
        }
    };

    let mut sides = BTreeMap::new();
    for (turma, aluno) in [(ta, aa), (tb, ab)] {
        sides.insert(
            turma.nome.clone(),
            CrossTurmaSide {
                aluno: aluno.nome.clone(),
                notas: aluno.notas.clone(),
                media_geral: round2(GradeAggregator::student_average(aluno)?),
            },
        );
    }

    Ok(CrossTurmaComparison {
        sides,
        materias: ta.materias.clone(),
    })
}

// ── Turma comparison ──────────────────────────────────────────────────────────

/// One turma's side of a comparison: per-materia averages over the shared
/// curriculum plus an overall mean of those averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurmaSide {
    pub materias: BTreeMap<String, f64>,
    pub student_count: usize,
    pub average_grade: f64,
}

/// Two turmas side by side, keyed by name. The shared `materias` list is
/// taken from the first turma and applied strictly to both.
#[derive(Debug, Clone, Serialize)]
pub struct TurmaComparison {
    #[serde(flatten)]
    pub sides: BTreeMap<String, TurmaSide>,
    pub materias: Vec<String>,
}

/// Compare two turmas subject by subject.
pub fn compare_turmas(school: &SchoolDocument, a: &str, b: &str) -> Result<TurmaComparison> {
    let (ta, tb) = match (find_turma(school, a), find_turma(school, b)) {
        (Some(ta), Some(tb)) => (ta, tb),
        _ => {
            return Err(CoachError::ComparisonSideMissing {
                a: a.to_string(),
                b: b.to_string(),
            })
        }
    };

    let materias = ta.materias.clone();
    if materias.is_empty() {
        return Err(CoachError::EmptyGradeSet {
            owner: ta.nome.clone(),
        });
    }

    let mut sides = BTreeMap::new();
    for turma in [ta, tb] {
        let mut per_materia = BTreeMap::new();
        let mut sum = 0.0;
        for materia in &materias {
            // An empty turma averages to 0 rather than failing; the class
            // exists, it just has no enrolment yet.
            let average = if turma.alunos.is_empty() {
                0.0
            } else {
                GradeAggregator::class_subject_average(turma, materia)?
            };
            per_materia.insert(materia.clone(), average);
            sum += average;
        }
        sides.insert(
            turma.nome.clone(),
            TurmaSide {
                materias: per_materia,
                student_count: turma.alunos.len(),
                average_grade: sum / materias.len() as f64,
            },
        );
    }

    Ok(TurmaComparison { sides, materias })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn school() -> SchoolDocument {
        serde_json::from_str(
            r#"{
                "turmas": [
                    {"nome": "8A", "materias": ["Math", "Port"],
                     "alunos": [
                        {"nome": "Ana", "notas": {"Math": 80.0, "Port": 60.0}},
                        {"nome": "Bruno", "notas": {"Math": 90.0, "Port": 70.0}}
                     ]},
                    {"nome": "8B", "materias": ["Math", "Port"],
                     "alunos": [
                        {"nome": "Carla", "notas": {"Math": 50.0, "Port": 40.0}},
                        {"nome": "Davi", "notas": {"Math": 70.0, "Port": 80.0}},
                        {"nome": "Enzo", "notas": {"Math": 60.0, "Port": 90.0}}
                     ]}
                ],
                "professores": [
                    {"nome": "Fabio", "materia": "Math", "nota": 9.0,
                     "turmas": ["8A", "8B", "GhostTurma"]},
                    {"nome": "Gilda", "materia": "Port", "nota": 8.0, "turmas": ["8A"]}
                ]
            }"#,
        )
        .unwrap()
    }

    // ── compare_professors ────────────────────────────────────────────────

    #[test]
    fn test_compare_professors_pooled_average() {
        let result = compare_professors(&school(), "Fabio", "Gilda").unwrap();
        let fabio = &result.sides["Fabio"];
        // Pooled over 5 students: (80+90+50+70+60)/5 = 70, not the
        // mean of class means ((85 + 60) / 2 = 72.5).
        assert_eq!(fabio.average_grade, 70.0);
        assert_eq!(fabio.student_count, 5);
        assert_eq!(fabio.turmas["8A"].average_grade, 85.0);
        assert_eq!(fabio.turmas["8B"].average_grade, 60.0);
        assert_eq!(fabio.turmas["8B"].students, 3);
    }

    #[test]
    fn test_compare_professors_skips_unknown_turma_reference() {
        let result = compare_professors(&school(), "Fabio", "Gilda").unwrap();
        assert!(!result.sides["Fabio"].turmas.contains_key("GhostTurma"));
    }

    #[test]
    fn test_compare_professors_missing_side_fails() {
        let err = compare_professors(&school(), "Fabio", "Nobody").unwrap_err();
        assert!(matches!(err, CoachError::ComparisonSideMissing { .. }));
    }

    #[test]
    fn test_compare_professors_missing_subject_is_fatal() {
        let mut school = school();
        school.turmas[0].alunos[0].notas.remove("Math");
        let err = compare_professors(&school, "Fabio", "Gilda").unwrap_err();
        assert!(matches!(err, CoachError::MissingSubject { .. }));
    }

    #[test]
    fn test_compare_professors_symmetric_under_swap() {
        let fwd = compare_professors(&school(), "Fabio", "Gilda").unwrap();
        let rev = compare_professors(&school(), "Gilda", "Fabio").unwrap();
        assert_eq!(fwd.sides["Fabio"], rev.sides["Fabio"]);
        assert_eq!(fwd.sides["Gilda"], rev.sides["Gilda"]);
    }

    #[test]
    fn test_compare_professors_nota_carried_through() {
        let result = compare_professors(&school(), "Fabio", "Gilda").unwrap();
        assert_eq!(result.sides["Gilda"].nota_professor, 8.0);
    }

    // ── compare_alunos_in_turma ───────────────────────────────────────────

    #[test]
    fn test_compare_alunos_in_turma() {
        let result = compare_alunos_in_turma(&school(), "8A", "Ana", "Bruno").unwrap();
        assert_eq!(result.turma, "8A");
        assert_eq!(result.sides["Ana"].media_geral, 70.0);
        assert_eq!(result.sides["Bruno"].media_geral, 80.0);
        assert_eq!(result.materias, vec!["Math", "Port"]);
    }

    #[test]
    fn test_compare_alunos_in_turma_unknown_turma() {
        let err = compare_alunos_in_turma(&school(), "9Z", "Ana", "Bruno").unwrap_err();
        assert!(matches!(err, CoachError::EntityNotFound { .. }));
    }

    #[test]
    fn test_compare_alunos_in_turma_missing_aluno() {
        let err = compare_alunos_in_turma(&school(), "8A", "Ana", "Zeca").unwrap_err();
        assert!(matches!(err, CoachError::ComparisonSideMissing { .. }));
    }

    #[test]
    fn test_compare_alunos_symmetric_under_swap() {
        let fwd = compare_alunos_in_turma(&school(), "8A", "Ana", "Bruno").unwrap();
        let rev = compare_alunos_in_turma(&school(), "8A", "Bruno", "Ana").unwrap();
        assert_eq!(fwd.sides["Ana"], rev.sides["Ana"]);
        assert_eq!(fwd.sides["Bruno"], rev.sides["Bruno"]);
    }

    // ── compare_alunos_across_turmas ──────────────────────────────────────

    #[test]
    fn test_compare_alunos_across_turmas() {
        let result =
            compare_alunos_across_turmas(&school(), "8A", "Ana", "8B", "Davi").unwrap();
        assert_eq!(result.sides["8A"].aluno, "Ana");
        assert_eq!(result.sides["8A"].media_geral, 70.0);
        assert_eq!(result.sides["8B"].aluno, "Davi");
        assert_eq!(result.sides["8B"].media_geral, 75.0);
        // materias comes from the first turma.
        assert_eq!(result.materias, vec!["Math", "Port"]);
    }

    #[test]
    fn test_compare_alunos_across_turmas_missing_turma() {
        let err =
            compare_alunos_across_turmas(&school(), "8A", "Ana", "9Z", "Davi").unwrap_err();
        assert!(matches!(err, CoachError::ComparisonSideMissing { .. }));
    }

    // ── compare_turmas ────────────────────────────────────────────────────

    #[test]
    fn test_compare_turmas() {
        let result = compare_turmas(&school(), "8A", "8B").unwrap();
        let side_a = &result.sides["8A"];
        assert_eq!(side_a.materias["Math"], 85.0);
        assert_eq!(side_a.materias["Port"], 65.0);
        assert_eq!(side_a.average_grade, 75.0);
        assert_eq!(side_a.student_count, 2);
        let side_b = &result.sides["8B"];
        assert_eq!(side_b.materias["Math"], 60.0);
        assert_eq!(side_b.materias["Port"], 70.0);
        assert_eq!(side_b.average_grade, 65.0);
    }

    #[test]
    fn test_compare_turmas_missing_side() {
        let err = compare_turmas(&school(), "8A", "9Z").unwrap_err();
        assert!(matches!(err, CoachError::ComparisonSideMissing { .. }));
    }

    #[test]
    fn test_compare_turmas_empty_side_averages_zero() {
        let mut school = school();
        school.turmas[1].alunos.clear();
        let result = compare_turmas(&school, "8A", "8B").unwrap();
        assert_eq!(result.sides["8B"].average_grade, 0.0);
        assert_eq!(result.sides["8B"].student_count, 0);
    }

    #[test]
    fn test_compare_turmas_symmetric_under_swap() {
        let fwd = compare_turmas(&school(), "8A", "8B").unwrap();
        let rev = compare_turmas(&school(), "8B", "8A").unwrap();
        assert_eq!(fwd.sides["8A"], rev.sides["8A"]);
        assert_eq!(fwd.sides["8B"], rev.sides["8B"]);
    }
}
