//! Whole-table snapshot persistence.
//!
//! A snapshot is an opaque byte blob: magic, format version, the
//! backing index kind, the schema, the tuples in insertion order, and
//! a CRC32 trailer over everything before it. The engine guarantees
//! round-trip identity on the table's observable state (schema and
//! ordered tuple list; the index is rebuilt on load) without fixing
//! the bit layout for callers.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use reldb_common::{Domain, IndexKind, RelError, Result, Scalar};
use tracing::debug;

use crate::schema::Schema;
use crate::table::Table;
use crate::tuple::Tuple;

/// Filename extension for named table snapshots.
pub const SNAPSHOT_EXT: &str = "dbf";

const MAGIC: &[u8; 4] = b"RDBS";
const VERSION: u16 = 1;

/// Writes a snapshot of the table to the byte sink. The sink is
/// flushed before returning.
pub fn save<W: Write>(table: &Table, mut sink: W) -> Result<()> {
    let body = encode(table);
    debug!(relation = %table.name(), bytes = body.len(), "save snapshot");
    sink.write_all(&body)?;
    sink.flush()?;
    Ok(())
}

/// Reads a snapshot from the byte source and rebuilds the table,
/// including its primary-key index.
pub fn load<R: Read>(mut source: R) -> Result<Table> {
    let mut data = Vec::new();
    source.read_to_end(&mut data)?;
    if data.len() < MAGIC.len() + 2 + 4 {
        return Err(RelError::SnapshotCorrupted("snapshot too short".to_string()));
    }

    let (body, trailer) = data.split_at(data.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(RelError::SnapshotCorrupted(format!(
            "checksum mismatch: stored={}, computed={}",
            stored, computed
        )));
    }

    let table = decode(body)?;
    debug!(relation = %table.name(), rows = table.len(), "load snapshot");
    Ok(table)
}

impl Table {
    /// Saves this table as `<dir>/<name>.dbf`, creating the directory
    /// if needed. Returns the written path.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", self.name(), SNAPSHOT_EXT));
        let file = fs::File::create(&path)?;
        save(self, io::BufWriter::new(file))?;
        Ok(path)
    }

    /// Loads the table saved under the given name in `dir`.
    pub fn load_named(dir: impl AsRef<Path>, name: &str) -> Result<Table> {
        let path = dir.as_ref().join(format!("{}.{}", name, SNAPSHOT_EXT));
        let file = fs::File::open(path)?;
        load(io::BufReader::new(file))
    }
}

fn kind_tag(kind: IndexKind) -> u8 {
    match kind {
        IndexKind::BTree => 0,
        IndexKind::ExtHash => 1,
        IndexKind::LinHash => 2,
    }
}

fn kind_from_tag(tag: u8) -> Result<IndexKind> {
    match tag {
        0 => Ok(IndexKind::BTree),
        1 => Ok(IndexKind::ExtHash),
        2 => Ok(IndexKind::LinHash),
        _ => Err(RelError::SnapshotCorrupted(format!(
            "invalid index kind tag: {}",
            tag
        ))),
    }
}

fn encode(table: &Table) -> Bytes {
    let schema = table.schema();
    let mut buf = BytesMut::new();

    buf.put_slice(MAGIC);
    buf.put_u16_le(VERSION);
    buf.put_u8(kind_tag(table.index_kind()));

    put_name(&mut buf, schema.name());
    buf.put_u16_le(schema.arity() as u16);
    for (attr, domain) in schema.attributes().iter().zip(schema.domains()) {
        put_name(&mut buf, attr);
        buf.put_u8(*domain as u8);
    }
    buf.put_u16_le(schema.key().len() as u16);
    for attr in schema.key() {
        put_name(&mut buf, attr);
    }

    buf.put_u32_le(table.len() as u32);
    for tuple in table.tuples() {
        for value in tuple.values() {
            put_scalar(&mut buf, value);
        }
    }

    let checksum = crc32fast::hash(&buf);
    buf.put_u32_le(checksum);
    buf.freeze()
}

fn decode(mut buf: &[u8]) -> Result<Table> {
    ensure(buf.remaining(), MAGIC.len() + 2 + 1)?;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(RelError::SnapshotCorrupted("bad magic".to_string()));
    }
    let version = buf.get_u16_le();
    if version != VERSION {
        return Err(RelError::SnapshotCorrupted(format!(
            "unsupported format version: {}",
            version
        )));
    }
    let kind = kind_from_tag(buf.get_u8())?;

    let name = get_name(&mut buf)?;

    ensure(buf.remaining(), 2)?;
    let arity = buf.get_u16_le() as usize;
    let mut attributes = Vec::with_capacity(arity);
    let mut domains = Vec::with_capacity(arity);
    for _ in 0..arity {
        attributes.push(get_name(&mut buf)?);
        ensure(buf.remaining(), 1)?;
        domains.push(Domain::try_from(buf.get_u8())?);
    }

    ensure(buf.remaining(), 2)?;
    let key_len = buf.get_u16_le() as usize;
    let mut key = Vec::with_capacity(key_len);
    for _ in 0..key_len {
        key.push(get_name(&mut buf)?);
    }

    let attr_refs: Vec<&str> = attributes.iter().map(String::as_str).collect();
    let key_refs: Vec<&str> = key.iter().map(String::as_str).collect();
    let schema = Schema::new(name, &attr_refs, &domains, &key_refs)?;

    ensure(buf.remaining(), 4)?;
    let rows = buf.get_u32_le() as usize;
    let mut table = Table::with_index(schema, kind);
    for _ in 0..rows {
        let mut values = Vec::with_capacity(arity);
        for domain in &domains {
            values.push(get_scalar(&mut buf, *domain)?);
        }
        table.insert(Tuple::new(values))?;
    }

    if buf.has_remaining() {
        return Err(RelError::SnapshotCorrupted(format!(
            "{} trailing bytes",
            buf.remaining()
        )));
    }
    Ok(table)
}

fn put_name(buf: &mut BytesMut, name: &str) {
    buf.put_u16_le(name.len() as u16);
    buf.put_slice(name.as_bytes());
}

fn get_name(buf: &mut &[u8]) -> Result<String> {
    ensure(buf.remaining(), 2)?;
    let len = buf.get_u16_le() as usize;
    ensure(buf.remaining(), len)?;
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RelError::SnapshotCorrupted("name is not valid UTF-8".to_string()))
}

fn put_scalar(buf: &mut BytesMut, value: &Scalar) {
    buf.put_u8(value.domain() as u8);
    match value {
        Scalar::Int8(v) => buf.put_i8(*v),
        Scalar::Int16(v) => buf.put_i16_le(*v),
        Scalar::Int32(v) => buf.put_i32_le(*v),
        Scalar::Int64(v) => buf.put_i64_le(*v),
        Scalar::Float32(v) => buf.put_f32_le(*v),
        Scalar::Float64(v) => buf.put_f64_le(*v),
        Scalar::Char(v) => buf.put_u32_le(*v as u32),
        Scalar::Text(v) => {
            buf.put_u32_le(v.len() as u32);
            buf.put_slice(v.as_bytes());
        }
    }
}

fn get_scalar(buf: &mut &[u8], expected: Domain) -> Result<Scalar> {
    ensure(buf.remaining(), 1)?;
    let domain = Domain::try_from(buf.get_u8())?;
    if domain != expected {
        return Err(RelError::SnapshotCorrupted(format!(
            "value tagged {} where schema expects {}",
            domain, expected
        )));
    }
    let value = match domain {
        Domain::Int8 => {
            ensure(buf.remaining(), 1)?;
            Scalar::Int8(buf.get_i8())
        }
        Domain::Int16 => {
            ensure(buf.remaining(), 2)?;
            Scalar::Int16(buf.get_i16_le())
        }
        Domain::Int32 => {
            ensure(buf.remaining(), 4)?;
            Scalar::Int32(buf.get_i32_le())
        }
        Domain::Int64 => {
            ensure(buf.remaining(), 8)?;
            Scalar::Int64(buf.get_i64_le())
        }
        Domain::Float32 => {
            ensure(buf.remaining(), 4)?;
            Scalar::Float32(buf.get_f32_le())
        }
        Domain::Float64 => {
            ensure(buf.remaining(), 8)?;
            Scalar::Float64(buf.get_f64_le())
        }
        Domain::Char => {
            ensure(buf.remaining(), 4)?;
            let code = buf.get_u32_le();
            char::from_u32(code)
                .map(Scalar::Char)
                .ok_or_else(|| {
                    RelError::SnapshotCorrupted(format!("invalid char code point: {}", code))
                })?
        }
        Domain::Text => {
            ensure(buf.remaining(), 4)?;
            let len = buf.get_u32_le() as usize;
            ensure(buf.remaining(), len)?;
            let bytes = buf.copy_to_bytes(len);
            Scalar::Text(String::from_utf8(bytes.to_vec()).map_err(|_| {
                RelError::SnapshotCorrupted("text value is not valid UTF-8".to_string())
            })?)
        }
    };
    Ok(value)
}

fn ensure(remaining: usize, bytes: usize) -> Result<()> {
    if remaining < bytes {
        Err(RelError::SnapshotCorrupted("truncated snapshot".to_string()))
    } else {
        Ok(())
    }
}
