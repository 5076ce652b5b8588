//! Dataset loading for the coach engine.
//!
//! Reads the two gradebook snapshots from configured paths and converts
//! them into typed documents. There is no caching: every query reloads
//! from disk, so callers always see the snapshot-refresh job's latest
//! output.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use coach_core::error::{CoachError, Result};
use coach_core::models::{CourseDocument, SchoolDocument};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the per-course gradebook snapshot from `path`.
///
/// Fails with [`CoachError::DatasetNotFound`] when the file is absent,
/// [`CoachError::DatasetMalformed`] when it is not valid JSON of the
/// expected shape, and [`CoachError::DatasetRead`] for any other read
/// error. Success performs no schema validation beyond the parse; missing
/// optional fields default downstream.
pub fn load_course_document(path: &Path) -> Result<CourseDocument> {
    let doc: CourseDocument = read_document(path)?;
    debug!(
        "Loaded {} courses from {}",
        doc.courses.len(),
        path.display()
    );
    Ok(doc)
}

/// Load the class/teacher snapshot from `path`. Same error contract as
/// [`load_course_document`].
pub fn load_school_document(path: &Path) -> Result<SchoolDocument> {
    let doc: SchoolDocument = read_document(path)?;
    debug!(
        "Loaded {} turmas and {} professores from {}",
        doc.turmas.len(),
        doc.professores.len(),
        path.display()
    );
    Ok(doc)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CoachError::DatasetNotFound(path.to_path_buf())
        } else {
            CoachError::DatasetRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|source| CoachError::DatasetMalformed {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
