//! Tests for the key/value reconciler

use kvsync_core::{Document, EntityKind, Error, Outcome, ReconcileOptions, Reconciler};
use kvsync_test_utils::{Call, MemoryStore};
use pretty_assertions::assert_eq;

fn document(yaml: &str) -> Document {
    Document::parse(yaml).unwrap()
}

fn run(store: &MemoryStore, yaml: &str) -> kvsync_core::Result<kvsync_core::ReconcileReport> {
    Reconciler::new(store, ReconcileOptions::default()).reconcile(&document(yaml))
}

#[test]
fn test_kv_entry_is_created() {
    let store = MemoryStore::new();

    let report = run(&store, "kv:\n  aa/blah: boom\n").unwrap();

    assert_eq!(store.get("aa/blah").as_deref(), Some("boom"));
    assert_eq!(report.outcome_of(EntityKind::Kv, "aa/blah"), Some(Outcome::Created));
}

#[test]
fn test_scalars_are_written_as_text() {
    let store = MemoryStore::new();

    run(
        &store,
        "kv:\n  aa/flag: true\n  aa/key1: 123\n  aa/key2: -123\n  aa/key3: 1.23\n",
    )
    .unwrap();

    assert_eq!(store.get("aa/flag").as_deref(), Some("true"));
    assert_eq!(store.get("aa/key1").as_deref(), Some("123"));
    assert_eq!(store.get("aa/key2").as_deref(), Some("-123"));
    assert_eq!(store.get("aa/key3").as_deref(), Some("1.23"));
}

#[test]
fn test_whole_floats_lose_their_fraction_unless_quoted() {
    let store = MemoryStore::new();

    run(&store, "kv:\n  app/version: 1.0\n  app/quoted: \"1.0\"\n").unwrap();

    assert_eq!(store.get("app/version").as_deref(), Some("1"));
    assert_eq!(store.get("app/quoted").as_deref(), Some("1.0"));
}

#[test]
fn test_changed_value_is_overwritten() {
    let store = MemoryStore::new();
    store.put("bb/blah", "bar");

    let report = run(&store, "kv:\n  bb/blah: foo\n").unwrap();

    assert_eq!(store.get("bb/blah").as_deref(), Some("foo"));
    assert_eq!(report.outcome_of(EntityKind::Kv, "bb/blah"), Some(Outcome::Updated));
}

#[test]
fn test_equal_value_is_not_written() {
    let store = MemoryStore::new();
    store.put("bb/blah", "foo");

    let report = run(&store, "kv:\n  bb/blah: foo\n").unwrap();

    assert!(store.writes().is_empty());
    assert_eq!(report.outcome_of(EntityKind::Kv, "bb/blah"), Some(Outcome::Unchanged));
}

#[test]
fn test_undeclared_key_is_deleted() {
    let store = MemoryStore::new();
    store.put("cc/blah", "foo");

    let report = run(&store, "kv:\n  dd/blah: test\n").unwrap();

    assert_eq!(store.get("cc/blah"), None);
    assert_eq!(store.keys(), vec!["dd/blah".to_string()]);
    assert_eq!(report.outcome_of(EntityKind::Kv, "cc/blah"), Some(Outcome::Deleted));
}

#[test]
fn test_ignored_tree_is_left_alone() {
    let store = MemoryStore::new();
    store.put("ee/blah", "foo");
    store.put("ee/deep/key", "bar");
    store.put("eee", "gone");

    let report = run(&store, "kv:\n  ee/: \"${ignore}\"\n").unwrap();

    assert_eq!(store.get("ee/blah").as_deref(), Some("foo"));
    assert_eq!(store.get("ee/deep/key").as_deref(), Some("bar"));
    assert_eq!(store.get("eee"), None);
    assert_eq!(report.outcome_of(EntityKind::Kv, "ee/blah"), Some(Outcome::Ignored));
    assert_eq!(store.writes(), vec![Call::DeleteKv("eee".to_string())]);
}

#[test]
fn test_ignored_key_is_left_alone() {
    let store = MemoryStore::new();
    store.put("ff/secret", "s3cr3t");

    run(&store, "kv:\n  ff/:\n    secret: \"${ignore}\"\n    other: x\n").unwrap();

    assert_eq!(store.get("ff/secret").as_deref(), Some("s3cr3t"));
    assert_eq!(store.get("ff/other").as_deref(), Some("x"));
}

#[test]
fn test_ignored_missing_key_is_not_created() {
    let store = MemoryStore::new();

    run(&store, "kv:\n  gg: \"${ignore}\"\n  hh: x\n").unwrap();

    assert_eq!(store.get("gg"), None);
    assert_eq!(store.writes(), vec![Call::PutKv("hh".to_string())]);
}

#[test]
fn test_subtree_flattening_writes_exactly_the_leaves() {
    let store = MemoryStore::new();

    run(&store, "kv:\n  a/:\n    b:\n      c: d\n    e: f\n").unwrap();

    assert_eq!(
        store.writes(),
        vec![
            Call::PutKv("a/b/c".to_string()),
            Call::PutKv("a/e".to_string()),
        ]
    );
    assert_eq!(store.get("a/b/c").as_deref(), Some("d"));
    assert_eq!(store.get("a/e").as_deref(), Some("f"));
}

#[test]
fn test_leaf_key_with_mapping_fails_without_writing_the_branch() {
    let store = MemoryStore::new();
    store.put("keep/me", "1");

    let err = run(&store, "kv:\n  dev:\n    a: b\n").unwrap_err();

    assert!(matches!(err, Error::InvalidLeaf { .. }));
    assert!(store.writes().is_empty());
    assert_eq!(store.get("keep/me").as_deref(), Some("1"));
}

#[test]
fn test_structural_error_keeps_earlier_writes_and_skips_purge() {
    let store = MemoryStore::new();
    store.put("orphan", "1");

    // Sorted walk order: "a/" is applied before "b/" fails.
    let err = run(&store, "kv:\n  a/:\n    x: 1\n  b/: not-a-tree\n  c: 2\n").unwrap_err();

    assert!(matches!(err, Error::InvalidSubtree { ref key, .. } if key == "b/"));
    assert_eq!(store.get("a/x").as_deref(), Some("1"));
    assert_eq!(store.get("c"), None);
    assert_eq!(store.get("orphan").as_deref(), Some("1"));
}

#[test]
fn test_failed_write_is_recorded_and_walk_continues() {
    let store = MemoryStore::new();
    store.fail_writes_for("a");

    let report = run(&store, "kv:\n  a: 1\n  b: 2\n").unwrap();

    assert_eq!(store.get("a"), None);
    assert_eq!(store.get("b").as_deref(), Some("2"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subject, "a");
    assert!(!report.is_clean());
}

#[test]
fn test_failed_delete_is_recorded() {
    let store = MemoryStore::new();
    store.put("stuck", "1");
    store.put("loose", "1");
    store.fail_writes_for("stuck");

    let report = run(&store, "kv:\n  a: 1\n").unwrap();

    assert_eq!(store.get("stuck").as_deref(), Some("1"));
    assert_eq!(store.get("loose"), None);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subject, "stuck");
}

#[test]
fn test_second_run_is_idempotent() {
    let store = MemoryStore::new();
    store.put("old/key", "x");
    store.put("ign/key", "y");
    let yaml = "kv:\n  app/:\n    port: 8080\n    db:\n      host: localhost\n  ign/: \"${ignore}\"\n  flag: false\n";

    let first = run(&store, yaml).unwrap();
    assert!(first.writes() > 0);

    store.clear_calls();
    let second = run(&store, yaml).unwrap();

    assert!(store.writes().is_empty());
    assert_eq!(second.writes(), 0);
}

#[test]
fn test_dry_run_reports_without_writing() {
    let store = MemoryStore::new();
    store.put("bb/blah", "bar");
    store.put("orphan", "1");

    let options = ReconcileOptions::default().dry_run(true);
    let report = Reconciler::new(&store, options)
        .reconcile(&document("kv:\n  bb/blah: foo\n  new: x\n"))
        .unwrap();

    assert!(store.writes().is_empty());
    assert!(report.dry_run);
    assert_eq!(report.outcome_of(EntityKind::Kv, "bb/blah"), Some(Outcome::Updated));
    assert_eq!(report.outcome_of(EntityKind::Kv, "new"), Some(Outcome::Created));
    assert_eq!(report.outcome_of(EntityKind::Kv, "orphan"), Some(Outcome::Deleted));
    assert_eq!(store.get("bb/blah").as_deref(), Some("bar"));
}

#[test]
fn test_empty_kv_section_does_not_purge() {
    let store = MemoryStore::new();
    store.put("keep", "1");

    run(&store, "kv: {}\n").unwrap();

    assert_eq!(store.get("keep").as_deref(), Some("1"));
    assert!(store.calls().is_empty());
}
