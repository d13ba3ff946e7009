//! Attribute domains for reldb values.

use crate::error::{RelError, Result};
use serde::{Deserialize, Serialize};

/// Identifier for the admissible value class of an attribute.
///
/// Domain tags are stored in schema metadata and snapshot headers to
/// identify the type of each column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Domain {
    // Signed integer widths
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,

    // Floating point widths
    Float32 = 10,
    Float64 = 11,

    // Text types
    Char = 20,
    Text = 21,
}

impl Domain {
    /// Returns the fixed byte width of values in this domain, or None for
    /// variable-length domains.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Domain::Int8 => Some(1),
            Domain::Int16 => Some(2),
            Domain::Int32 | Domain::Float32 | Domain::Char => Some(4),
            Domain::Int64 | Domain::Float64 => Some(8),
            Domain::Text => None,
        }
    }

    /// Returns true if this domain is a signed integer domain.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Domain::Int8 | Domain::Int16 | Domain::Int32 | Domain::Int64
        )
    }

    /// Returns true if this domain is a floating-point domain.
    pub fn is_float(&self) -> bool {
        matches!(self, Domain::Float32 | Domain::Float64)
    }

    /// Returns true if this domain holds character data.
    pub fn is_text(&self) -> bool {
        matches!(self, Domain::Char | Domain::Text)
    }
}

impl TryFrom<u8> for Domain {
    type Error = RelError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Domain::Int8),
            1 => Ok(Domain::Int16),
            2 => Ok(Domain::Int32),
            3 => Ok(Domain::Int64),
            10 => Ok(Domain::Float32),
            11 => Ok(Domain::Float64),
            20 => Ok(Domain::Char),
            21 => Ok(Domain::Text),
            _ => Err(RelError::SnapshotCorrupted(format!(
                "invalid domain tag: {}",
                value
            ))),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::Int8 => "INT8",
            Domain::Int16 => "INT16",
            Domain::Int32 => "INT32",
            Domain::Int64 => "INT64",
            Domain::Float32 => "FLOAT32",
            Domain::Float64 => "FLOAT64",
            Domain::Char => "CHAR",
            Domain::Text => "TEXT",
        };
        write!(f, "{}", name)
    }
}
