//! Relational kernel for reldb.
//!
//! This crate provides:
//! - Schema definitions with column resolution and type checking
//! - Immutable tuples of scalar values
//! - Tables combining a tuple list with a pluggable primary-key index
//! - The relational algebra operators: project, select (predicate and
//!   key), union, minus, equi-join, and index join
//! - Whole-table snapshot persistence with round-trip identity

mod schema;
mod snapshot;
mod table;
mod tuple;

pub use schema::Schema;
pub use snapshot::{load, save, SNAPSHOT_EXT};
pub use table::Table;
pub use tuple::Tuple;
