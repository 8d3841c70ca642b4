use crate::engine::errors::MergeError;
use crate::engine::merge::column_selection::ColumnSelection;
use crate::engine::merge::merge_session::{MergeSession, read_input_list};
use crate::engine::merge::tree_merger::MergeOptions;
use crate::engine::table::{TableFile, TableSource, TableWriter};
use crate::test_helpers::factories::TableFactory;
use std::fs;
use tempfile::tempdir;

#[test]
fn input_list_skips_blank_lines() {
    let dir = tempdir().unwrap();
    let list = dir.path().join("inputs.txt");
    fs::write(&list, "a.root\n\n   \n  b.root  \n").unwrap();

    let paths = read_input_list(&list).unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[1].to_str(), Some("b.root"));
}

#[test]
fn files_without_the_tree_are_skipped() {
    let dir = tempdir().unwrap();
    let a = TableFactory::events("physics", &[(1, 1)]).create_in(dir.path(), "a");
    let b = TableFactory::events("other", &[(1, 1)]).create_in(dir.path(), "b");
    let list = dir.path().join("inputs.txt");
    fs::write(&list, format!("{}\n{}\n", a.display(), b.display())).unwrap();

    let session = MergeSession::open(&list, "physics").unwrap();
    assert_eq!(session.opened_files(), 2);
    assert_eq!(session.usable_inputs(), 1);
    assert_eq!(session.tables()[0].name(), "physics");
    assert_eq!(session.tree_name(), "physics");
}

#[test]
fn unreadable_input_is_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.root");
    let err = MergeSession::from_paths(&[missing], "physics").err().unwrap();
    assert!(matches!(err, MergeError::OpenInput { .. }));

    let err = MergeSession::open(dir.path().join("no_list.txt"), "physics")
        .err()
        .unwrap();
    assert!(matches!(err, MergeError::InputList { .. }));
}

#[test]
fn session_merges_its_inputs() {
    let dir = tempdir().unwrap();
    let a = TableFactory::events("physics", &[(1, 1), (1, 2), (1, 3)]).create_in(dir.path(), "a");
    let b = TableFactory::events("physics", &[(2, 1), (2, 2)]).create_in(dir.path(), "b");
    let session = MergeSession::from_paths(&[a, b], "physics").unwrap();

    let base = dir.path().join("merged");
    let report = session
        .merge(MergeOptions::new(ColumnSelection::All, 1 << 20), |schema| {
            TableWriter::create(&base, "physics", schema, u64::MAX)
        })
        .unwrap();
    drop(session);

    assert_eq!(report.rows_copied, 5);
    let out = TableFile::open(&report.fragments[0])
        .unwrap()
        .table("physics")
        .unwrap()
        .unwrap();
    assert_eq!(out.entries(), 5);
}
