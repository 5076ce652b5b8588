//! Data and reporting layer for the coach engine.
//!
//! Responsible for loading gradebook snapshots from disk, indexing
//! entities, computing derived statistics, building comparisons and
//! producing streamed report events for the query surface.

pub mod aggregator;
pub mod comparison;
pub mod index;
pub mod loader;
pub mod queries;
pub mod stream;
