//! Streamed report events.
//!
//! Large report queries are delivered as a sequence of tagged events, one
//! JSON object per line, instead of one buffered payload. The streams here
//! are pull-based iterators with no internal event buffering: each call to
//! `next` does the work for exactly one event, so a dropped consumer costs
//! nothing beyond what it already pulled.
//!
//! Every stream terminates with exactly one terminal event: `Complete` on
//! success or `Error` when the dataset could not be loaded at all.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use coach_core::cohort::Cohort;
use coach_core::error::CoachError;
use coach_core::models::{round2, CourseDocument, Grade};

use crate::aggregator::GradeAggregator;

// ── Events ────────────────────────────────────────────────────────────────────

/// One line of a streamed report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    Summary {
        total_courses: usize,
    },
    CourseStart {
        course_id: String,
        course_name: String,
        total_students: usize,
    },
    Grade {
        course_id: String,
        course_name: String,
        grade: Grade,
    },
    CourseData {
        course_id: String,
        itabira: CohortCourseStats,
        bom_despacho: CohortCourseStats,
    },
    CourseEnd {
        course_id: String,
        course_name: String,
    },
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<CohortComparison>,
    },
    Error {
        error: String,
    },
}

impl ReportEvent {
    /// Whether this event ends its stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportEvent::Complete { .. } | ReportEvent::Error { .. })
    }
}

/// Per-course statistics for one cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortCourseStats {
    pub course_name: String,
    pub average_grade: f64,
    pub student_count: usize,
    pub average_completion_rate: f64,
}

impl CohortCourseStats {
    fn empty(course_name: &str) -> Self {
        CohortCourseStats {
            course_name: course_name.to_string(),
            average_grade: 0.0,
            student_count: 0,
            average_completion_rate: 0.0,
        }
    }
}

/// The full accumulated cohort comparison carried by the terminal
/// `Complete` event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CohortComparison {
    #[serde(rename = "Itabira")]
    pub itabira: BTreeMap<String, CohortCourseStats>,
    #[serde(rename = "Bom_Despacho")]
    pub bom_despacho: BTreeMap<String, CohortCourseStats>,
}

/// The course catalogue every cohort comparison must cover. Courses absent
/// from the snapshot still get a zero-valued record per entry here.
pub static EXPECTED_COURSES: [(&str, &str); 11] = [
    ("course-v1:Projeto_Desenvolve+PY001+2024_S2", "Python 1"),
    ("course-v1:ProjetoDesenvolve+Scratch1+01", "Scratch 1"),
    ("course-v1:ProjetoDesenvolve+NoCode1+01", "No Code 1"),
    ("course-v1:ProjetoDesenvolve+Linux1+01", "Linux 1"),
    ("course-v1:ProjetoDesenvolve+IntroWeb+01", "Introdução à Web"),
    (
        "course-v1:ProjetoDesenvolve+POO1+01",
        "Programação Orientada a Objetos (POO) 1",
    ),
    ("course-v1:ProjetoDesenvolve+JS1+01", "JavaScript 1"),
    ("course-v1:ProjetoDesenvolve+BD1+01", "Banco de Dados 1"),
    ("course-v1:ProjetoDesenvolve+Python2+2024", "Python 2"),
    ("course-v1:ProjetoDesenvolve+Projeto1+01", "Projeto 1"),
    ("course-v1:ProjetoDesenvolve+Projeto2+01", "Projeto 2"),
];

// ── Grade stream ──────────────────────────────────────────────────────────────

enum GradeState {
    Summary,
    NextCourse,
    Grades {
        course_id: String,
        course_name: String,
        pending: std::vec::IntoIter<Grade>,
    },
    Failed(String),
    Done,
}

/// Streams every grade of every course:
/// `Summary`, then per course `CourseStart`, one `Grade` per student and
/// `CourseEnd`, then `Complete`.
pub struct GradeStream {
    courses: std::collections::btree_map::IntoIter<String, coach_core::models::CourseRecord>,
    total_courses: usize,
    state: GradeState,
}

impl GradeStream {
    pub fn new(doc: CourseDocument) -> Self {
        let total_courses = doc.courses.len();
        GradeStream {
            courses: doc.courses.into_iter(),
            total_courses,
            state: GradeState::Summary,
        }
    }

    /// A stream whose only event reports the given load failure.
    pub fn from_error(err: &CoachError) -> Self {
        GradeStream {
            courses: BTreeMap::new().into_iter(),
            total_courses: 0,
            state: GradeState::Failed(err.to_string()),
        }
    }
}

impl Iterator for GradeStream {
    type Item = ReportEvent;

    fn next(&mut self) -> Option<ReportEvent> {
        loop {
            match &mut self.state {
                GradeState::Summary => {
                    self.state = GradeState::NextCourse;
                    return Some(ReportEvent::Summary {
                        total_courses: self.total_courses,
                    });
                }
                GradeState::NextCourse => match self.courses.next() {
                    Some((course_id, record)) => {
                        let course_name = record.display_name(&course_id).to_string();
                        let total_students = record.grades.len();
                        debug!(
                            "Streaming course {} with {} grades",
                            course_id, total_students
                        );
                        let event = ReportEvent::CourseStart {
                            course_id: course_id.clone(),
                            course_name: course_name.clone(),
                            total_students,
                        };
                        self.state = GradeState::Grades {
                            course_id,
                            course_name,
                            pending: record.grades.into_iter(),
                        };
                        return Some(event);
                    }
                    None => {
                        self.state = GradeState::Done;
                        return Some(ReportEvent::Complete { data: None });
                    }
                },
                GradeState::Grades {
                    course_id,
                    course_name,
                    pending,
                } => match pending.next() {
                    Some(grade) => {
                        return Some(ReportEvent::Grade {
                            course_id: course_id.clone(),
                            course_name: course_name.clone(),
                            grade,
                        });
                    }
                    None => {
                        let event = ReportEvent::CourseEnd {
                            course_id: course_id.clone(),
                            course_name: course_name.clone(),
                        };
                        self.state = GradeState::NextCourse;
                        return Some(event);
                    }
                },
                GradeState::Failed(message) => {
                    let error = message.clone();
                    self.state = GradeState::Done;
                    return Some(ReportEvent::Error { error });
                }
                GradeState::Done => return None,
            }
        }
    }
}

// ── Cohort stream ─────────────────────────────────────────────────────────────

enum CohortState {
    Summary,
    NextCourse,
    CourseData {
        course_id: String,
        course_name: String,
        itabira: CohortCourseStats,
        bom_despacho: CohortCourseStats,
    },
    CourseEnd {
        course_id: String,
        course_name: String,
    },
    Backfill(usize),
    Complete,
    Failed(String),
    Done,
}

/// Streams the city comparison:
/// `Summary`, then per course `CourseStart`, `CourseData` and `CourseEnd`,
/// then zero-valued `CourseData` records for catalogue courses missing
/// from the snapshot, then `Complete` carrying the full comparison.
pub struct CohortStream {
    courses: std::collections::btree_map::IntoIter<String, coach_core::models::CourseRecord>,
    total_courses: usize,
    comparison: CohortComparison,
    processed: BTreeSet<String>,
    state: CohortState,
}

impl CohortStream {
    pub fn new(doc: CourseDocument) -> Self {
        let total_courses = doc.courses.len();
        CohortStream {
            courses: doc.courses.into_iter(),
            total_courses,
            comparison: CohortComparison::default(),
            processed: BTreeSet::new(),
            state: CohortState::Summary,
        }
    }

    /// A stream whose only event reports the given load failure.
    pub fn from_error(err: &CoachError) -> Self {
        CohortStream {
            courses: BTreeMap::new().into_iter(),
            total_courses: 0,
            comparison: CohortComparison::default(),
            processed: BTreeSet::new(),
            state: CohortState::Failed(err.to_string()),
        }
    }
}

impl Iterator for CohortStream {
    type Item = ReportEvent;

    fn next(&mut self) -> Option<ReportEvent> {
        loop {
            match &mut self.state {
                CohortState::Summary => {
                    self.state = CohortState::NextCourse;
                    return Some(ReportEvent::Summary {
                        total_courses: self.total_courses,
                    });
                }
                CohortState::NextCourse => match self.courses.next() {
                    Some((course_id, record)) => {
                        let course_name = record.display_name(&course_id).to_string();
                        let (itabira, bom_despacho) =
                            split_by_cohort(&course_name, &record.grades);
                        debug!(
                            "Course {}: {} Itabira / {} Bom Despacho students",
                            course_id, itabira.student_count, bom_despacho.student_count
                        );
                        self.processed.insert(course_id.clone());
                        let event = ReportEvent::CourseStart {
                            course_id: course_id.clone(),
                            course_name: course_name.clone(),
                            total_students: record.grades.len(),
                        };
                        self.state = CohortState::CourseData {
                            course_id,
                            course_name,
                            itabira,
                            bom_despacho,
                        };
                        return Some(event);
                    }
                    None => {
                        self.state = CohortState::Backfill(0);
                    }
                },
                CohortState::CourseData {
                    course_id,
                    course_name,
                    itabira,
                    bom_despacho,
                } => {
                    let event = ReportEvent::CourseData {
                        course_id: course_id.clone(),
                        itabira: itabira.clone(),
                        bom_despacho: bom_despacho.clone(),
                    };
                    self.comparison
                        .itabira
                        .insert(course_id.clone(), itabira.clone());
                    self.comparison
                        .bom_despacho
                        .insert(course_id.clone(), bom_despacho.clone());
                    self.state = CohortState::CourseEnd {
                        course_id: course_id.clone(),
                        course_name: course_name.clone(),
                    };
                    return Some(event);
                }
                CohortState::CourseEnd {
                    course_id,
                    course_name,
                } => {
                    let event = ReportEvent::CourseEnd {
                        course_id: course_id.clone(),
                        course_name: course_name.clone(),
                    };
                    self.state = CohortState::NextCourse;
                    return Some(event);
                }
                CohortState::Backfill(index) => {
                    let remaining = &EXPECTED_COURSES[*index..];
                    let Some(offset) = remaining
                        .iter()
                        .position(|(id, _)| !self.processed.contains(*id))
                    else {
                        self.state = CohortState::Complete;
                        continue;
                    };
                    let (course_id, course_name) = remaining[offset];
                    debug!("Backfilling absent course {}", course_id);
                    self.state = CohortState::Backfill(*index + offset + 1);
                    let stats = CohortCourseStats::empty(course_name);
                    self.comparison
                        .itabira
                        .insert(course_id.to_string(), stats.clone());
                    self.comparison
                        .bom_despacho
                        .insert(course_id.to_string(), stats.clone());
                    return Some(ReportEvent::CourseData {
                        course_id: course_id.to_string(),
                        itabira: stats.clone(),
                        bom_despacho: stats,
                    });
                }
                CohortState::Complete => {
                    let data = std::mem::take(&mut self.comparison);
                    self.state = CohortState::Done;
                    return Some(ReportEvent::Complete { data: Some(data) });
                }
                CohortState::Failed(message) => {
                    let error = message.clone();
                    self.state = CohortState::Done;
                    return Some(ReportEvent::Error { error });
                }
                CohortState::Done => return None,
            }
        }
    }
}

/// Partition one course's grades by cohort and reduce each side to its
/// stats. Students are counted by distinct user id; a missing id counts
/// as id 0.
fn split_by_cohort(course_name: &str, grades: &[Grade]) -> (CohortCourseStats, CohortCourseStats) {
    struct Acc {
        grades: Vec<f64>,
        completions: Vec<f64>,
        students: BTreeSet<i64>,
    }

    impl Acc {
        fn new() -> Self {
            Acc {
                grades: Vec::new(),
                completions: Vec::new(),
                students: BTreeSet::new(),
            }
        }

        fn into_stats(self, course_name: &str) -> CohortCourseStats {
            let mean = |values: &[f64]| {
                if values.is_empty() {
                    0.0
                } else {
                    round2(values.iter().sum::<f64>() / values.len() as f64)
                }
            };
            CohortCourseStats {
                course_name: course_name.to_string(),
                average_grade: mean(&self.grades),
                student_count: self.students.len(),
                average_completion_rate: mean(&self.completions),
            }
        }
    }

    let mut itabira = Acc::new();
    let mut bom_despacho = Acc::new();
    for grade in grades {
        let acc = match Cohort::of_grade(grade) {
            Cohort::Itabira => &mut itabira,
            Cohort::BomDespacho => &mut bom_despacho,
        };
        acc.grades.push(grade.calculated_grade);
        acc.completions.push(GradeAggregator::completion_rate(grade));
        acc.students.insert(grade.user_id.unwrap_or(0));
    }

    (
        itabira.into_stats(course_name),
        bom_despacho.into_stats(course_name),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
