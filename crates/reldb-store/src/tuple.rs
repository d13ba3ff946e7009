//! Tuple representation.

use reldb_common::{Key, Scalar};

/// One row of a table: an ordered, fixed-length sequence of scalar
/// values. Tuples are immutable after insertion and compare by
/// position-wise value equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    values: Vec<Scalar>,
}

impl Tuple {
    /// Creates a tuple from its values.
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    /// Returns the values in order.
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Returns the value at the given column position.
    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.values.get(index)
    }

    /// Returns the number of values (tuple arity).
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Builds a smaller tuple by positional copy.
    pub fn extract(&self, positions: &[usize]) -> Tuple {
        Tuple::new(positions.iter().map(|&i| self.values[i].clone()).collect())
    }

    /// Builds the key projection at the given positions.
    pub fn key_at(&self, positions: &[usize]) -> Key {
        Key::new(positions.iter().map(|&i| self.values[i].clone()).collect())
    }

    /// Concatenates two tuples left-to-right.
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Tuple::new(values)
    }
}

impl From<Vec<Scalar>> for Tuple {
    fn from(values: Vec<Scalar>) -> Self {
        Self::new(values)
    }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Tuple {
        Tuple::new(vec![Scalar::Int64(1), Scalar::from("A"), Scalar::Float64(3.5)])
    }

    #[test]
    fn test_access() {
        let tuple = student();
        assert_eq!(tuple.arity(), 3);
        assert_eq!(tuple.get(0), Some(&Scalar::Int64(1)));
        assert_eq!(tuple.get(1), Some(&Scalar::from("A")));
        assert!(tuple.get(3).is_none());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(student(), student());
        let other = Tuple::new(vec![Scalar::Int64(2), Scalar::from("A"), Scalar::Float64(3.5)]);
        assert_ne!(student(), other);
    }

    #[test]
    fn test_extract_positional_copy() {
        let tuple = student();
        let projected = tuple.extract(&[2, 0]);
        assert_eq!(
            projected,
            Tuple::new(vec![Scalar::Float64(3.5), Scalar::Int64(1)])
        );
    }

    #[test]
    fn test_key_projection() {
        let tuple = student();
        let key = tuple.key_at(&[0]);
        assert_eq!(key, reldb_common::Key::single(1i64));
    }

    #[test]
    fn test_concat() {
        let left = Tuple::new(vec![Scalar::Int64(1)]);
        let right = Tuple::new(vec![Scalar::from("c1"), Scalar::Int64(3)]);
        let joined = left.concat(&right);
        assert_eq!(joined.arity(), 3);
        assert_eq!(joined.get(1), Some(&Scalar::from("c1")));
    }

    #[test]
    fn test_display() {
        assert_eq!(student().to_string(), "(1, A, 3.5)");
    }
}
