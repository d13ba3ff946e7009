//! Relational tables and algebra operators.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use reldb_common::{IndexKind, Key, RelError, Result, StoreConfig};
use reldb_index::{AssocMap, BpTreeMap, ExtHashMap, LinHashMap};
use tracing::debug;

use crate::schema::Schema;
use crate::tuple::Tuple;

/// Counter for naming tables derived by the algebra operators.
static DERIVED_SEQ: AtomicUsize = AtomicUsize::new(0);

fn derived_name(base: &str) -> String {
    format!("{}_{}", base, DERIVED_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// A relation: a schema, an insertion-ordered tuple list, and a
/// primary-key index mapping each key projection to its tuple.
///
/// Any of the three index structures can back the table; operators
/// that need keyed access probe the index, all others scan the tuple
/// list in insertion order.
pub struct Table {
    schema: Schema,
    tuples: Vec<Tuple>,
    /// Maps primary-key projections to positions in `tuples`.
    index: Box<dyn AssocMap<Key, usize>>,
    index_kind: IndexKind,
    key_positions: Vec<usize>,
}

fn build_index(kind: IndexKind, config: &StoreConfig) -> Box<dyn AssocMap<Key, usize>> {
    match kind {
        IndexKind::BTree => Box::new(BpTreeMap::with_order(config.btree_order)),
        IndexKind::ExtHash => Box::new(ExtHashMap::with_buckets(config.initial_buckets)),
        IndexKind::LinHash => Box::new(LinHashMap::with_buckets(config.initial_buckets)),
    }
}

impl Table {
    /// Creates an empty table with the default configuration
    /// (B+-tree index).
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, &StoreConfig::default())
    }

    /// Creates an empty table backed by the given index structure.
    pub fn with_index(schema: Schema, kind: IndexKind) -> Self {
        let config = StoreConfig {
            index_kind: kind,
            ..StoreConfig::default()
        };
        Self::with_config(schema, &config)
    }

    /// Creates an empty table per the given configuration.
    pub fn with_config(schema: Schema, config: &StoreConfig) -> Self {
        debug!(
            relation = %schema.name(),
            attributes = ?schema.attributes(),
            index = ?config.index_kind,
            "create table"
        );
        let key_positions = schema.key_positions();
        Self {
            index: build_index(config.index_kind, config),
            index_kind: config.index_kind,
            schema,
            tuples: Vec::new(),
            key_positions,
        }
    }

    /// Returns the table's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Returns the tuples in insertion order.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Returns the number of stored tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Returns true if the table holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Returns which index structure backs this table.
    pub fn index_kind(&self) -> IndexKind {
        self.index_kind
    }

    /// Returns the number of keys in the primary-key index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Returns the column position of the given attribute name.
    pub fn col(&self, attr: &str) -> Option<usize> {
        self.schema.col(attr)
    }

    /// Returns the primary-key index contents as key-tuple pairs.
    pub fn index_entries(&self) -> Vec<(Key, Tuple)> {
        self.index
            .entries()
            .into_iter()
            .map(|(key, position)| (key, self.tuples[position].clone()))
            .collect()
    }

    /// Inserts a tuple: validates it against the schema, appends it to
    /// the tuple list, and indexes it by its primary-key projection.
    /// Rejection leaves the table unmodified.
    pub fn insert(&mut self, tuple: Tuple) -> Result<()> {
        debug!(relation = %self.schema.name(), tuple = %tuple, "insert");
        self.schema.type_check(&tuple)?;
        self.push_row(tuple);
        Ok(())
    }

    /// Appends a tuple known to satisfy the schema and indexes it.
    /// Index duplicate policy applies: the B+-tree keeps the first
    /// tuple per key, the hashed structures keep the last.
    fn push_row(&mut self, tuple: Tuple) {
        let key = tuple.key_at(&self.key_positions);
        let position = self.tuples.len();
        self.tuples.push(tuple);
        self.index.put(key, position);
    }

    fn derive(&self, schema: Schema, rows: Vec<Tuple>) -> Table {
        let mut table = Table::with_index(schema, self.index_kind);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    fn derive_same_schema(&self, rows: Vec<Tuple>) -> Table {
        let schema = self.schema.with_name(derived_name(self.schema.name()));
        self.derive(schema, rows)
    }

    /// Projects the tuples onto the named attributes, preserving
    /// insertion order. The primary key is carried over if the
    /// projection retains all of it; otherwise the projected
    /// attributes become the key, with uniqueness not re-enforced.
    pub fn project(&self, attributes: &[&str]) -> Result<Table> {
        debug!(relation = %self.schema.name(), ?attributes, "project");
        let positions = self.schema.match_columns(attributes)?;
        let domains = self.schema.extract_domains(&positions);

        let retains_key = self
            .schema
            .key()
            .iter()
            .all(|k| attributes.contains(&k.as_str()));
        let key: Vec<&str> = if retains_key {
            self.schema.key().iter().map(String::as_str).collect()
        } else {
            attributes.to_vec()
        };

        let schema = Schema::new(
            derived_name(self.schema.name()),
            attributes,
            &domains,
            &key,
        )?;
        let rows = self.tuples.iter().map(|t| t.extract(&positions)).collect();
        Ok(self.derive(schema, rows))
    }

    /// Selects the tuples satisfying the predicate, preserving
    /// insertion order.
    pub fn select(&self, predicate: impl Fn(&Tuple) -> bool) -> Table {
        debug!(relation = %self.schema.name(), "select by predicate");
        let rows = self
            .tuples
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect();
        self.derive_same_schema(rows)
    }

    /// Selects by primary-key value through the index. The result
    /// holds the unique matching tuple or is empty.
    pub fn select_key(&self, key: &Key) -> Table {
        debug!(relation = %self.schema.name(), key = %key, "select by key");
        let rows = match self.index.get(key) {
            Some(&position) => vec![self.tuples[position].clone()],
            None => Vec::new(),
        };
        self.derive_same_schema(rows)
    }

    /// Set union by tuple value: this table's tuples in order,
    /// followed by the other's tuples whose value is not already
    /// present. Requires compatible schemas.
    pub fn union(&self, other: &Table) -> Result<Table> {
        debug!(left = %self.schema.name(), right = %other.schema.name(), "union");
        self.schema.check_compatible(&other.schema)?;

        let mut rows: Vec<Tuple> = self.tuples.clone();
        for tuple in &other.tuples {
            if !rows.contains(tuple) {
                rows.push(tuple.clone());
            }
        }
        Ok(self.derive_same_schema(rows))
    }

    /// Set difference by tuple value: this table's tuples whose value
    /// equals no tuple of the other. Requires compatible schemas.
    pub fn minus(&self, other: &Table) -> Result<Table> {
        debug!(left = %self.schema.name(), right = %other.schema.name(), "minus");
        self.schema.check_compatible(&other.schema)?;

        let rows = self
            .tuples
            .iter()
            .filter(|t| !other.tuples.contains(t))
            .cloned()
            .collect();
        Ok(self.derive_same_schema(rows))
    }

    /// Equi-join on the listed attribute pairs: emits the
    /// concatenation of every pair of tuples that agree on all listed
    /// positions, outer loop over this table, inner over the other.
    /// Duplicate attribute names from the right side are suffixed `2`.
    pub fn join(&self, attrs_left: &[&str], attrs_right: &[&str], other: &Table) -> Result<Table> {
        debug!(
            left = %self.schema.name(),
            right = %other.schema.name(),
            ?attrs_left,
            ?attrs_right,
            "join"
        );
        let (pos_left, pos_right) = self.join_positions(attrs_left, attrs_right, other)?;
        let schema = self.joined_schema(other)?;

        let mut rows = Vec::new();
        for left in &self.tuples {
            for right in &other.tuples {
                let matches = pos_left
                    .iter()
                    .zip(&pos_right)
                    .all(|(&a, &b)| left.values()[a] == right.values()[b]);
                if matches {
                    rows.push(left.concat(right));
                }
            }
        }
        Ok(self.derive(schema, rows))
    }

    /// Equi-join that probes the other table's primary-key index with
    /// this table's values at `attrs_left`. The probed attributes must
    /// be exactly the other table's primary key.
    pub fn index_join(
        &self,
        attrs_left: &[&str],
        attrs_right: &[&str],
        other: &Table,
    ) -> Result<Table> {
        debug!(
            left = %self.schema.name(),
            right = %other.schema.name(),
            ?attrs_left,
            ?attrs_right,
            "index join"
        );
        let (pos_left, _) = self.join_positions(attrs_left, attrs_right, other)?;
        let key_matches = other.schema.key().len() == attrs_right.len()
            && other.schema.key().iter().zip(attrs_right).all(|(k, a)| k == a);
        if !key_matches {
            return Err(RelError::NotPrimaryKey {
                attributes: attrs_right.iter().map(|a| a.to_string()).collect(),
                relation: other.schema.name().to_string(),
            });
        }
        let schema = self.joined_schema(other)?;

        let mut rows = Vec::new();
        for left in &self.tuples {
            let key = left.key_at(&pos_left);
            if let Some(&position) = other.index.get(&key) {
                rows.push(left.concat(&other.tuples[position]));
            }
        }
        Ok(self.derive(schema, rows))
    }

    fn join_positions(
        &self,
        attrs_left: &[&str],
        attrs_right: &[&str],
        other: &Table,
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        if attrs_left.len() != attrs_right.len() {
            return Err(RelError::SchemaMismatch {
                reason: format!(
                    "join attribute lists have lengths {} and {}",
                    attrs_left.len(),
                    attrs_right.len()
                ),
            });
        }
        let pos_left = self.schema.match_columns(attrs_left)?;
        let pos_right = other.schema.match_columns(attrs_right)?;
        Ok((pos_left, pos_right))
    }

    /// The concatenated schema of an equi-join: this table's
    /// attributes, then the other's with colliding names suffixed `2`.
    /// The result carries this table's primary key.
    fn joined_schema(&self, other: &Table) -> Result<Schema> {
        let mut attributes: Vec<String> = self.schema.attributes().to_vec();
        for attr in other.schema.attributes() {
            if self.schema.col(attr).is_some() {
                attributes.push(format!("{}2", attr));
            } else {
                attributes.push(attr.clone());
            }
        }
        let mut domains = self.schema.domains().to_vec();
        domains.extend_from_slice(other.schema.domains());

        let attr_refs: Vec<&str> = attributes.iter().map(String::as_str).collect();
        let key_refs: Vec<&str> = self.schema.key().iter().map(String::as_str).collect();
        Schema::new(
            derived_name(self.schema.name()),
            &attr_refs,
            &domains,
            &key_refs,
        )
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("rows", &self.tuples.len())
            .field("index_kind", &self.index_kind)
            .finish()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = format!("|-{}-|", "-".repeat(15 * self.schema.arity()));
        writeln!(f, "Table {}", self.schema.name())?;
        writeln!(f, "{}", rule)?;
        write!(f, "| ")?;
        for attr in self.schema.attributes() {
            write!(f, "{:>15}", attr)?;
        }
        writeln!(f, " |")?;
        writeln!(f, "{}", rule)?;
        for tuple in &self.tuples {
            write!(f, "| ")?;
            for value in tuple.values() {
                write!(f, "{:>15}", value.to_string())?;
            }
            writeln!(f, " |")?;
        }
        write!(f, "{}", rule)
    }
}
