//! Core domain types for the coach reporting engine.
//!
//! Defines the gradebook data model shared by every crate, the error
//! taxonomy, the cohort-assignment heuristic and runtime settings.

pub mod cohort;
pub mod error;
pub mod models;
pub mod settings;
