//! Associative index structures for reldb.
//!
//! This crate provides:
//! - A common mapping contract (`AssocMap`) with an ordered extension
//!   (`OrderedMap`) gating range operations
//! - An order-preserving B+-tree map with arena-allocated nodes and a
//!   linked leaf chain for range scans
//! - An extendible-hashing map that grows by directory doubling
//! - A linear-hashing map that grows one bucket at a time behind a
//!   split pointer, with overflow chains
//!
//! Any of the three structures can back a table's primary-key index;
//! range-dependent operators require the B+-tree.

pub mod bptree;
pub mod constants;
pub mod exthash;
pub mod linhash;
pub mod map;

pub use bptree::BpTreeMap;
pub use constants::{BUCKET_SLOTS, DEFAULT_BUCKETS, DEFAULT_ORDER, MAX_LOAD_FACTOR};
pub use exthash::ExtHashMap;
pub use linhash::LinHashMap;
pub use map::{AssocMap, OrderedMap, PutOutcome};
