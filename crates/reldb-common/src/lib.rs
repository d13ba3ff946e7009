//! reldb common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all reldb components.

pub mod config;
pub mod error;
pub mod key;
pub mod types;
pub mod value;

pub use config::{IndexKind, StoreConfig};
pub use error::{RelError, Result};
pub use key::Key;
pub use types::Domain;
pub use value::Scalar;
