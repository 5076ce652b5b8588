use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of entity a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Course,
    Turma,
    Aluno,
    Professor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Course => "course",
            EntityKind::Turma => "turma",
            EntityKind::Aluno => "aluno",
            EntityKind::Professor => "professor",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by the transport layer to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The requested entity or dataset does not exist.
    NotFound,
    /// The caller supplied an unusable parameter.
    InvalidInput,
    /// The dataset violates a structural expectation.
    DataIntegrity,
    /// Anything else: I/O, parse failures, wrapped errors.
    Internal,
}

/// All errors produced by the coach reporting engine.
#[derive(Error, Debug)]
pub enum CoachError {
    /// The dataset file is absent.
    #[error("dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    /// The dataset file exists but is not valid JSON of the expected shape.
    #[error("malformed dataset {path}: {source}")]
    DatasetMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The dataset file could not be read for a reason other than absence.
    #[error("failed to read dataset {path}: {source}")]
    DatasetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A course, turma, aluno or professor lookup found nothing.
    #[error("{kind} not found: {name}")]
    EntityNotFound { kind: EntityKind, name: String },

    /// An average was requested over an empty grade set.
    #[error("no grades to average for {owner}")]
    EmptyGradeSet { owner: String },

    /// An aluno is missing a materia the turma's curriculum requires.
    #[error("aluno {aluno} has no grade for materia {materia}")]
    MissingSubject { aluno: String, materia: String },

    /// One or both sides of a comparison resolved to no entity. A partial
    /// comparison is never computed.
    #[error("one or both comparison entities not found: {a}, {b}")]
    ComparisonSideMissing { a: String, b: String },

    /// An email key with an empty local part.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Pass-through for raw I/O errors that do not carry a dataset path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoachError {
    /// Classify the error for status mapping at the query boundary.
    pub fn severity(&self) -> Severity {
        match self {
            CoachError::DatasetNotFound(_) | CoachError::EntityNotFound { .. } => {
                Severity::NotFound
            }
            CoachError::InvalidEmail(_) => Severity::InvalidInput,
            CoachError::EmptyGradeSet { .. } | CoachError::MissingSubject { .. } => {
                Severity::DataIntegrity
            }
            CoachError::ComparisonSideMissing { .. } => Severity::NotFound,
            CoachError::DatasetMalformed { .. }
            | CoachError::DatasetRead { .. }
            | CoachError::Io(_)
            | CoachError::Other(_) => Severity::Internal,
        }
    }
}

/// Convenience alias used throughout the coach crates.
pub type Result<T> = std::result::Result<T, CoachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_dataset_not_found() {
        let err = CoachError::DatasetNotFound(PathBuf::from("/data/all_grades.json"));
        assert_eq!(
            err.to_string(),
            "dataset file not found: /data/all_grades.json"
        );
    }

    #[test]
    fn test_error_display_entity_not_found() {
        let err = CoachError::EntityNotFound {
            kind: EntityKind::Turma,
            name: "8A".to_string(),
        };
        assert_eq!(err.to_string(), "turma not found: 8A");
    }

    #[test]
    fn test_error_display_empty_grade_set() {
        let err = CoachError::EmptyGradeSet {
            owner: "Ana".to_string(),
        };
        assert_eq!(err.to_string(), "no grades to average for Ana");
    }

    #[test]
    fn test_error_display_missing_subject() {
        let err = CoachError::MissingSubject {
            aluno: "Bruno".to_string(),
            materia: "Math".to_string(),
        };
        assert_eq!(err.to_string(), "aluno Bruno has no grade for materia Math");
    }

    #[test]
    fn test_error_display_comparison_side_missing() {
        let err = CoachError::ComparisonSideMissing {
            a: "Carlos".to_string(),
            b: "Dirce".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Carlos"));
        assert!(msg.contains("Dirce"));
    }

    #[test]
    fn test_error_display_malformed_includes_path() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CoachError::DatasetMalformed {
            path: PathBuf::from("/data/new_grades.json"),
            source,
        };
        assert!(err.to_string().contains("/data/new_grades.json"));
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            CoachError::DatasetNotFound(PathBuf::from("x")).severity(),
            Severity::NotFound
        );
        assert_eq!(
            CoachError::InvalidEmail("@pd.edu".to_string()).severity(),
            Severity::InvalidInput
        );
        assert_eq!(
            CoachError::MissingSubject {
                aluno: "a".to_string(),
                materia: "m".to_string()
            }
            .severity(),
            Severity::DataIntegrity
        );
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(CoachError::Io(io_err).severity(), Severity::Internal);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CoachError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
