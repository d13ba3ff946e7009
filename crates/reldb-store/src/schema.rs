//! Relation schemas and column resolution.

use reldb_common::{Domain, RelError, Result};
use tracing::warn;

use crate::tuple::Tuple;

/// The meta-data of a relation: its name, ordered attribute names,
/// matching domains, and primary-key attribute list.
///
/// Attribute names within one schema are unique; the key is a
/// non-empty subsequence of the attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    attributes: Vec<String>,
    domains: Vec<Domain>,
    key: Vec<String>,
}

impl Schema {
    /// Creates a validated schema.
    pub fn new(
        name: impl Into<String>,
        attributes: &[&str],
        domains: &[Domain],
        key: &[&str],
    ) -> Result<Self> {
        let name = name.into();
        let attributes: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
        let key: Vec<String> = key.iter().map(|a| a.to_string()).collect();

        if attributes.len() != domains.len() {
            return Err(RelError::InvalidSchema {
                relation: name,
                reason: format!(
                    "{} attributes but {} domains",
                    attributes.len(),
                    domains.len()
                ),
            });
        }
        if attributes.is_empty() {
            return Err(RelError::InvalidSchema {
                relation: name,
                reason: "relation has no attributes".to_string(),
            });
        }
        for (i, attr) in attributes.iter().enumerate() {
            if attributes[..i].contains(attr) {
                return Err(RelError::InvalidSchema {
                    relation: name,
                    reason: format!("duplicate attribute {}", attr),
                });
            }
        }
        if key.is_empty() {
            return Err(RelError::InvalidSchema {
                relation: name,
                reason: "primary key is empty".to_string(),
            });
        }
        for attr in &key {
            if !attributes.contains(attr) {
                return Err(RelError::InvalidSchema {
                    relation: name,
                    reason: format!("key attribute {} not in relation", attr),
                });
            }
        }

        Ok(Self {
            name,
            attributes,
            domains: domains.to_vec(),
            key,
        })
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of this schema under a new relation name.
    pub fn with_name(&self, name: impl Into<String>) -> Schema {
        Schema {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns the ordered attribute names.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Returns the ordered attribute domains.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Returns the primary-key attribute names.
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Returns the number of attributes.
    pub fn arity(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the column position of the given attribute name.
    pub fn col(&self, attr: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attr)
    }

    /// Resolves the named columns to their positions. An unmatched
    /// name is an `UnknownAttribute` error.
    pub fn match_columns(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|column| {
                self.col(column).ok_or_else(|| {
                    warn!(relation = %self.name, column, "no matching attribute");
                    RelError::UnknownAttribute(column.to_string())
                })
            })
            .collect()
    }

    /// Returns the positions of the primary-key attributes.
    pub fn key_positions(&self) -> Vec<usize> {
        self.key
            .iter()
            .map(|attr| self.col(attr).expect("key attributes validated at construction"))
            .collect()
    }

    /// Returns the domains at the given positions.
    pub fn extract_domains(&self, positions: &[usize]) -> Vec<Domain> {
        positions.iter().map(|&i| self.domains[i]).collect()
    }

    /// Checks tuple arity and per-position domain membership. A match
    /// passes; any mismatch rejects.
    pub fn type_check(&self, tuple: &Tuple) -> Result<()> {
        if tuple.arity() != self.arity() {
            return Err(RelError::ArityMismatch {
                expected: self.arity(),
                actual: tuple.arity(),
            });
        }
        for (i, (value, domain)) in tuple.values().iter().zip(&self.domains).enumerate() {
            if value.domain() != *domain {
                return Err(RelError::TypeMismatch {
                    column: i,
                    expected: domain.to_string(),
                    actual: value.domain().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns true if the two schemas have equal arity with
    /// position-wise equal domains.
    pub fn compatible(&self, other: &Schema) -> bool {
        self.domains == other.domains
    }

    /// Compatibility as an error-reporting check, used to gate union
    /// and difference.
    pub fn check_compatible(&self, other: &Schema) -> Result<()> {
        if self.domains.len() != other.domains.len() {
            return Err(RelError::SchemaMismatch {
                reason: format!(
                    "{} has arity {} but {} has arity {}",
                    self.name,
                    self.domains.len(),
                    other.name,
                    other.domains.len()
                ),
            });
        }
        for (i, (left, right)) in self.domains.iter().zip(&other.domains).enumerate() {
            if left != right {
                return Err(RelError::SchemaMismatch {
                    reason: format!(
                        "{} and {} disagree on domain {} ({} vs {})",
                        self.name, other.name, i, left, right
                    ),
                });
            }
        }
        Ok(())
    }
}
