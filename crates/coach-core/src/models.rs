use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Course-keyed snapshot ──────────────────────────────────────────────────────

/// A gradable sub-component of a course (quiz, assignment, exam).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Short label assigned by the gradebook exporter.
    #[serde(default)]
    pub label: String,
    /// Full subsection name; empty string when the exporter had none, in
    /// which case `label` is the display name.
    #[serde(default)]
    pub subsection_name: String,
    /// Points the student earned in this section.
    #[serde(default)]
    pub score_earned: f64,
    /// Points available in this section. Sections with 0 possible points
    /// are excluded from percentage denominators.
    #[serde(default)]
    pub score_possible: f64,
    /// Whether the student attempted the section at all.
    #[serde(default)]
    pub attempted: bool,
    /// Fractional score in 0..1 as computed at ingestion time. Absent for
    /// sections the exporter never scored.
    #[serde(default)]
    pub percent: Option<f64>,
}

impl Section {
    /// Display name: `subsection_name`, falling back to `label` when empty.
    pub fn display_name(&self) -> &str {
        if self.subsection_name.is_empty() {
            &self.label
        } else {
            &self.subsection_name
        }
    }

    /// `percent` scaled to 0..100. A missing percent counts as 0, which
    /// classifies the section as weak.
    pub fn percent_scaled(&self) -> f64 {
        self.percent.unwrap_or(0.0) * 100.0
    }
}

/// One student's grade record within a course.
///
/// `calculated_grade` was computed at ingestion time and is surfaced as
/// stored; it is never recomputed from `section_breakdown` and the two may
/// legitimately diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    /// Platform user id. Null for records the exporter could not resolve.
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Overall course grade in 0..100 as stored in the snapshot.
    #[serde(default)]
    pub calculated_grade: f64,
    #[serde(default)]
    pub section_breakdown: Vec<Section>,
}

/// A course entry in the per-course snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Human-readable course name; callers fall back to the course id.
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl CourseRecord {
    /// `course_name`, falling back to the course id.
    pub fn display_name<'a>(&'a self, course_id: &'a str) -> &'a str {
        self.course_name.as_deref().unwrap_or(course_id)
    }
}

/// The per-course gradebook snapshot: a JSON object keyed by course id.
///
/// Keys are normalised to sorted order on load; the snapshot's object key
/// order carries no meaning for consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseDocument {
    pub courses: BTreeMap<String, CourseRecord>,
}

// ── Class/teacher snapshot ─────────────────────────────────────────────────────

/// A student within a turma. `notas` maps subject name to grade and is
/// expected to cover every materia of the owning turma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aluno {
    pub nome: String,
    #[serde(default)]
    pub notas: BTreeMap<String, f64>,
}

/// A class sharing a subject curriculum. `nome` is the unique lookup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turma {
    pub nome: String,
    #[serde(default)]
    pub materias: Vec<String>,
    #[serde(default)]
    pub alunos: Vec<Aluno>,
}

/// A teacher with a rating and name references to the turmas they teach.
///
/// `turmas` entries are weak references: a name with no matching turma is
/// silently skipped during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professor {
    pub nome: String,
    #[serde(default)]
    pub materia: String,
    #[serde(default)]
    pub nota: f64,
    #[serde(default)]
    pub turmas: Vec<String>,
}

/// The per-class/teacher snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoolDocument {
    #[serde(default)]
    pub turmas: Vec<Turma>,
    #[serde(default)]
    pub professores: Vec<Professor>,
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// Round to two decimal places, matching the precision of the upstream
/// report payloads.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Section ────────────────────────────────────────────────────────────

    #[test]
    fn test_section_display_name_prefers_subsection() {
        let section = Section {
            label: "HW".to_string(),
            subsection_name: "Homework 3".to_string(),
            score_earned: 1.0,
            score_possible: 2.0,
            attempted: true,
            percent: Some(0.5),
        };
        assert_eq!(section.display_name(), "Homework 3");
    }

    #[test]
    fn test_section_display_name_falls_back_to_label() {
        let section = Section {
            label: "HW".to_string(),
            subsection_name: String::new(),
            score_earned: 0.0,
            score_possible: 0.0,
            attempted: false,
            percent: None,
        };
        assert_eq!(section.display_name(), "HW");
    }

    #[test]
    fn test_section_percent_scaled_missing_is_zero() {
        let section: Section = serde_json::from_str("{}").unwrap();
        assert_eq!(section.percent_scaled(), 0.0);
    }

    #[test]
    fn test_section_percent_scaled() {
        let section: Section = serde_json::from_str(r#"{"percent": 0.85}"#).unwrap();
        assert!((section.percent_scaled() - 85.0).abs() < 1e-9);
    }

    // ── Grade / CourseDocument deserialization ─────────────────────────────

    #[test]
    fn test_grade_defaults_for_missing_fields() {
        let grade: Grade = serde_json::from_str(r#"{"username": "pdita_ana"}"#).unwrap();
        assert_eq!(grade.username, "pdita_ana");
        assert_eq!(grade.user_id, None);
        assert_eq!(grade.calculated_grade, 0.0);
        assert!(grade.section_breakdown.is_empty());
    }

    #[test]
    fn test_course_document_keyed_by_course_id() {
        let json = r#"{
            "course-v1:PD+PY1+01": {"course_name": "Python 1", "grades": []},
            "course-v1:PD+JS1+01": {"grades": []}
        }"#;
        let doc: CourseDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.courses.len(), 2);
        let record = &doc.courses["course-v1:PD+PY1+01"];
        assert_eq!(record.display_name("course-v1:PD+PY1+01"), "Python 1");
        // Missing course_name falls back to the id.
        let unnamed = &doc.courses["course-v1:PD+JS1+01"];
        assert_eq!(unnamed.display_name("course-v1:PD+JS1+01"), "course-v1:PD+JS1+01");
    }

    // ── SchoolDocument deserialization ─────────────────────────────────────

    #[test]
    fn test_school_document_defaults() {
        let doc: SchoolDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.turmas.is_empty());
        assert!(doc.professores.is_empty());
    }

    #[test]
    fn test_school_document_full_shape() {
        let json = r#"{
            "turmas": [
                {"nome": "8A", "materias": ["Math"], "alunos": [
                    {"nome": "Ana", "notas": {"Math": 80.0}}
                ]}
            ],
            "professores": [
                {"nome": "Carlos", "materia": "Math", "nota": 9.1, "turmas": ["8A"]}
            ]
        }"#;
        let doc: SchoolDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.turmas[0].alunos[0].notas["Math"], 80.0);
        assert_eq!(doc.professores[0].turmas, vec!["8A"]);
    }

    // ── round2 ─────────────────────────────────────────────────────────────

    #[test]
    fn test_round2() {
        assert_eq!(round2(75.456), 75.46);
        assert_eq!(round2(75.454), 75.45);
        assert_eq!(round2(0.0), 0.0);
    }
}
