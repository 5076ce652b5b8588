//! Heuristic cohort (city) assignment.
//!
//! Students are grouped into two site cohorts. Most usernames encode the
//! site directly (`pdita` / `pdbd` substrings); the rest are assigned
//! deterministically by user-id parity so that repeated queries always
//! place the same student in the same cohort.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Grade;

/// A site cohort inferred from username patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cohort {
    Itabira,
    BomDespacho,
}

impl Cohort {
    /// Assign a cohort from a username and user id.
    ///
    /// The username substring always wins over the parity fallback:
    /// `"pdita"` maps to Itabira and `"pdbd"` to Bom Despacho regardless
    /// of the id. Otherwise odd ids go to Itabira and even ids to Bom
    /// Despacho. The match is case-sensitive; callers lowercase first.
    pub fn assign(username: &str, user_id: i64) -> Cohort {
        if username.contains("pdita") {
            Cohort::Itabira
        } else if username.contains("pdbd") {
            Cohort::BomDespacho
        } else if user_id % 2 != 0 {
            Cohort::Itabira
        } else {
            Cohort::BomDespacho
        }
    }

    /// Assign a cohort from a grade record: lowercased username, with a
    /// null user id participating in the parity fallback as 0.
    pub fn of_grade(grade: &Grade) -> Cohort {
        Cohort::assign(&grade.username.to_lowercase(), grade.user_id.unwrap_or(0))
    }

    /// Stable key used in report payloads (`"Itabira"` / `"Bom_Despacho"`).
    pub fn key(&self) -> &'static str {
        match self {
            Cohort::Itabira => "Itabira",
            Cohort::BomDespacho => "Bom_Despacho",
        }
    }

    /// Short site code used by the query surface (`PDITA` / `PDBD`).
    pub fn code(&self) -> &'static str {
        match self {
            Cohort::Itabira => "PDITA",
            Cohort::BomDespacho => "PDBD",
        }
    }

    /// Parse a site code. Accepts the same values `code()` produces.
    pub fn from_code(code: &str) -> Option<Cohort> {
        match code {
            "PDITA" => Some(Cohort::Itabira),
            "PDBD" => Some(Cohort::BomDespacho),
            _ => None,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cohort::Itabira => "Itabira",
            Cohort::BomDespacho => "Bom Despacho",
        };
        f.write_str(name)
    }
}
