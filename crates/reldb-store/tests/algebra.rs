//! End-to-end scenarios for the relational algebra operators.

use reldb_common::{Domain, IndexKind, Key, RelError, Scalar};
use reldb_store::{load, save, Schema, Table, Tuple};

fn student() -> Table {
    let schema = Schema::new(
        "student",
        &["id", "name"],
        &[Domain::Int64, Domain::Text],
        &["id"],
    )
    .unwrap();
    let mut table = Table::new(schema);
    table
        .insert(Tuple::new(vec![Scalar::Int64(1), Scalar::from("A")]))
        .unwrap();
    table
        .insert(Tuple::new(vec![Scalar::Int64(2), Scalar::from("B")]))
        .unwrap();
    table
}

fn enroll() -> Table {
    let schema = Schema::new(
        "enroll",
        &["sid", "cid"],
        &[Domain::Int64, Domain::Text],
        &["sid", "cid"],
    )
    .unwrap();
    let mut table = Table::new(schema);
    for (sid, cid) in [(1, "c1"), (1, "c2"), (3, "c3")] {
        table
            .insert(Tuple::new(vec![Scalar::Int64(sid), Scalar::from(cid)]))
            .unwrap();
    }
    table
}

fn row(values: Vec<Scalar>) -> Tuple {
    Tuple::new(values)
}

#[test]
fn join_on_disjoint_attribute_names() {
    let student = student();
    let enroll = enroll();

    let joined = student.join(&["id"], &["sid"], &enroll).unwrap();
    assert_eq!(
        joined.schema().attributes(),
        &["id", "name", "sid", "cid"]
    );
    assert_eq!(
        joined.tuples(),
        &[
            row(vec![
                Scalar::Int64(1),
                Scalar::from("A"),
                Scalar::Int64(1),
                Scalar::from("c1"),
            ]),
            row(vec![
                Scalar::Int64(1),
                Scalar::from("A"),
                Scalar::Int64(1),
                Scalar::from("c2"),
            ]),
        ]
    );
}

#[test]
fn index_join_matches_nested_loop_join() {
    let student = student();
    let enroll = enroll();

    // Probe the student primary key from the enroll side.
    let by_index = enroll.index_join(&["sid"], &["id"], &student).unwrap();
    let by_scan = enroll.join(&["sid"], &["id"], &student).unwrap();

    assert_eq!(by_index.len(), 2);
    let mut index_rows = by_index.tuples().to_vec();
    let mut scan_rows = by_scan.tuples().to_vec();
    index_rows.sort_by_key(|t| t.to_string());
    scan_rows.sort_by_key(|t| t.to_string());
    assert_eq!(index_rows, scan_rows);
}

#[test]
fn join_with_empty_table_is_empty() {
    let student = student();
    let empty = Table::new(
        Schema::new(
            "enroll",
            &["sid", "cid"],
            &[Domain::Int64, Domain::Text],
            &["sid", "cid"],
        )
        .unwrap(),
    );
    let joined = student.join(&["id"], &["sid"], &empty).unwrap();
    assert!(joined.is_empty());
}

#[test]
fn project_all_attributes_is_identity_on_tuples() {
    let student = student();
    let projected = student.project(&["id", "name"]).unwrap();
    assert_eq!(projected.tuples(), student.tuples());
}

#[test]
fn select_true_is_identity_on_tuples() {
    let student = student();
    let selected = student.select(|_| true);
    assert_eq!(selected.tuples(), student.tuples());
}

#[test]
fn union_with_self_is_identity_as_set() {
    let student = student();
    let union = student.union(&student).unwrap();
    assert_eq!(union.tuples(), student.tuples());
}

#[test]
fn minus_self_is_empty() {
    let student = student();
    let minus = student.minus(&student).unwrap();
    assert!(minus.is_empty());
}

#[test]
fn index_maps_every_tuple_key() {
    let enroll = enroll();
    assert_eq!(enroll.index_len(), enroll.len());
    for (key, tuple) in enroll.index_entries() {
        let positions = enroll.schema().key_positions();
        assert_eq!(tuple.key_at(&positions), key);
    }
}

#[test]
fn select_key_probes_composite_key() {
    let enroll = enroll();
    let key = Key::new(vec![Scalar::Int64(1), Scalar::from("c2")]);
    let hit = enroll.select_key(&key);
    assert_eq!(hit.len(), 1);
    assert_eq!(hit.tuples()[0].get(1), Some(&Scalar::from("c2")));

    let miss = enroll.select_key(&Key::new(vec![Scalar::Int64(9), Scalar::from("c9")]));
    assert!(miss.is_empty());
}

#[test]
fn operators_compose() {
    let student = student();
    let enroll = enroll();

    let names = student
        .join(&["id"], &["sid"], &enroll)
        .unwrap()
        .select(|t| t.get(3) == Some(&Scalar::from("c2")))
        .project(&["name"])
        .unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names.tuples()[0].get(0), Some(&Scalar::from("A")));
}

#[test]
fn roundtrip_through_memory() {
    let enroll = enroll();
    let mut blob = Vec::new();
    save(&enroll, &mut blob).unwrap();
    let loaded = load(blob.as_slice()).unwrap();

    assert_eq!(loaded.schema(), enroll.schema());
    assert_eq!(loaded.tuples(), enroll.tuples());
    assert_eq!(loaded.index_len(), enroll.index_len());
}

#[test]
fn roundtrip_through_named_files() {
    let dir = tempfile::tempdir().unwrap();
    for kind in [IndexKind::BTree, IndexKind::ExtHash, IndexKind::LinHash] {
        let schema = Schema::new(
            "course",
            &["cid", "title"],
            &[Domain::Text, Domain::Text],
            &["cid"],
        )
        .unwrap();
        let mut table = Table::with_index(schema, kind);
        table
            .insert(Tuple::new(vec![Scalar::from("c1"), Scalar::from("Databases")]))
            .unwrap();

        let path = table.save_in(dir.path()).unwrap();
        assert!(path.exists());

        let loaded = Table::load_named(dir.path(), "course").unwrap();
        assert_eq!(loaded.tuples(), table.tuples());
        assert_eq!(loaded.index_kind(), kind);
    }
}

#[test]
fn load_missing_named_table_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Table::load_named(dir.path(), "absent");
    assert!(matches!(result, Err(RelError::Io(_))));
}

#[test]
fn algebra_works_over_hashed_indexes() {
    for kind in [IndexKind::ExtHash, IndexKind::LinHash] {
        let schema = Schema::new(
            "student",
            &["id", "name"],
            &[Domain::Int64, Domain::Text],
            &["id"],
        )
        .unwrap();
        let mut student = Table::with_index(schema, kind);
        for i in 0..100i64 {
            student
                .insert(Tuple::new(vec![
                    Scalar::Int64(i),
                    Scalar::from(format!("s{}", i)),
                ]))
                .unwrap();
        }

        let hit = student.select_key(&Key::single(42i64));
        assert_eq!(hit.len(), 1);

        // Every enroll row finds its student among ids 0..100.
        let enroll = enroll();
        let joined = enroll.index_join(&["sid"], &["id"], &student).unwrap();
        assert_eq!(joined.len(), 3);
    }
}
