//! Entity lookups over loaded documents.
//!
//! All lookups are linear scans with first-match semantics; dataset sizes
//! are bounded by the number of students in a class or course, so no
//! indexing structures are built. Absence is not an error at this layer:
//! every function returns an `Option` and the caller decides severity.

use coach_core::models::{
    Aluno, CourseDocument, CourseRecord, Grade, Professor, SchoolDocument, Turma,
};

/// Look up a course by its id.
pub fn find_course<'a>(doc: &'a CourseDocument, course_id: &str) -> Option<&'a CourseRecord> {
    doc.courses.get(course_id)
}

/// Look up a turma by name. Exact, case-sensitive match; first match wins
/// if the snapshot carries duplicates.
pub fn find_turma<'a>(school: &'a SchoolDocument, nome: &str) -> Option<&'a Turma> {
    school.turmas.iter().find(|t| t.nome == nome)
}

/// Look up an aluno within a turma by name.
pub fn find_aluno<'a>(turma: &'a Turma, nome: &str) -> Option<&'a Aluno> {
    turma.alunos.iter().find(|a| a.nome == nome)
}

/// Look up a professor by name.
pub fn find_professor<'a>(school: &'a SchoolDocument, nome: &str) -> Option<&'a Professor> {
    school.professores.iter().find(|p| p.nome == nome)
}

/// Find one course's grade record for a student by email,
/// case-insensitively.
pub fn find_grade_by_email<'a>(record: &'a CourseRecord, email: &str) -> Option<&'a Grade> {
    record
        .grades
        .iter()
        .find(|g| g.email.eq_ignore_ascii_case(email))
}

/// Collect every grade across all courses whose username matches
/// case-insensitively. Returns `(course_id, record, grade)` triples in
/// course-id order.
pub fn grades_for_username<'a>(
    doc: &'a CourseDocument,
    username: &str,
) -> Vec<(&'a str, &'a CourseRecord, &'a Grade)> {
    let mut found = Vec::new();
    for (course_id, record) in &doc.courses {
        for grade in &record.grades {
            if grade.username.eq_ignore_ascii_case(username) {
                found.push((course_id.as_str(), record, grade));
            }
        }
    }
    found
}

/// Collect every grade across all courses carrying the given platform
/// user id. Records with a null id never match.
pub fn grades_for_user_id(
    doc: &CourseDocument,
    user_id: i64,
) -> Vec<(&str, &CourseRecord, &Grade)> {
    let mut found = Vec::new();
    for (course_id, record) in &doc.courses {
        for grade in &record.grades {
            if grade.user_id == Some(user_id) {
                found.push((course_id.as_str(), record, grade));
            }
        }
    }
    found
}
