use crate::engine::errors::{MergeError, TableError};
use crate::engine::grl::{GoodRunList, LumiRange};
use crate::engine::merge::column_selection::ColumnSelection;
use crate::engine::merge::tree_merger::{MergeOptions, MergeState, TreeMerger, branch_totals};
use crate::engine::table::{
    ColumnKind, ColumnSpec, Row, Table, TableFile, TableSchema, TableSink, TableSource,
    TableWriter, Value,
};
use crate::test_helpers::factories::{MemoryTable, TableFactory};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn open_table(path: &Path, name: &str) -> Table {
    TableFile::open(path).unwrap().table(name).unwrap().unwrap()
}

fn two_inputs(dir: &Path) -> Vec<Table> {
    let a = TableFactory::events("physics", &[(100, 5), (100, 6), (100, 20)]).create_in(dir, "a");
    let b = TableFactory::events("physics", &[(101, 1), (102, 3)]).create_in(dir, "b");
    vec![open_table(&a, "physics"), open_table(&b, "physics")]
}

fn writer_in(dir: &Path) -> impl FnOnce(TableSchema) -> Result<TableWriter, TableError> {
    let base = dir.join("merged");
    move |schema| TableWriter::create(base, "physics", schema, u64::MAX)
}

fn run_numbers(table: &Table) -> Vec<Value> {
    (0..table.entries())
        .map(|e| table.load_entry(e).unwrap()[0].clone())
        .collect()
}

#[test]
fn merges_all_rows_in_input_order() {
    use crate::logging::init_for_tests;
    init_for_tests();

    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());

    let mut merger = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 30 * 1024 * 1024));
    let report = merger.merge(&inputs, writer_in(dir.path())).unwrap();

    assert_eq!(merger.state(), MergeState::Finalized);
    assert_eq!(report.rows_seen, 5);
    assert_eq!(report.rows_copied, 5);
    assert_eq!(report.efficiency(), 1.0);
    assert_eq!(report.fragments, vec![dir.path().join("merged.root")]);

    let out = open_table(&report.fragments[0], "physics");
    assert_eq!(out.entries(), 5);
    assert_eq!(
        run_numbers(&out),
        vec![
            Value::Int(100),
            Value::Int(100),
            Value::Int(100),
            Value::Int(101),
            Value::Int(102)
        ]
    );
    // EventNumber is unique per input row: check exact sequence
    let events: Vec<Value> = (0..5).map(|e| out.load_entry(e).unwrap()[2].clone()).collect();
    assert_eq!(
        events,
        vec![
            Value::Int(100_000),
            Value::Int(100_001),
            Value::Int(100_002),
            Value::Int(101_000),
            Value::Int(102_001)
        ]
    );
}

#[test]
fn grl_filters_rows_by_run_and_lumi_block() {
    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());
    let grl = GoodRunList::new(vec![LumiRange::new(100, 5, 10), LumiRange::new(102, 1, 5)]);

    let options = MergeOptions::new(ColumnSelection::All, 1 << 20).with_grl(grl);
    let report = TreeMerger::new(options)
        .merge(&inputs, writer_in(dir.path()))
        .unwrap();

    assert_eq!(report.rows_seen, 5);
    assert_eq!(report.rows_copied, 3);
    assert_eq!(report.efficiency(), 0.6);

    let out = open_table(&report.fragments[0], "physics");
    assert_eq!(
        run_numbers(&out),
        vec![Value::Int(100), Value::Int(100), Value::Int(102)]
    );
}

#[test]
fn empty_grl_rejects_every_row() {
    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());
    let options = MergeOptions::new(ColumnSelection::All, 1 << 20).with_grl(GoodRunList::default());
    let report = TreeMerger::new(options)
        .merge(&inputs, writer_in(dir.path()))
        .unwrap();

    assert_eq!(report.rows_seen, 5);
    assert_eq!(report.rows_copied, 0);
    assert_eq!(report.efficiency(), 0.0);
    assert_eq!(open_table(&report.fragments[0], "physics").entries(), 0);
}

#[test]
fn selection_restricts_output_columns() {
    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());
    let selection = ColumnSelection::from_lines(["RunNumber", "el_*"]);

    let report = TreeMerger::new(MergeOptions::new(selection, 1 << 20))
        .merge(&inputs, writer_in(dir.path()))
        .unwrap();

    assert_eq!(report.columns, vec!["RunNumber", "el_pt"]);
    let out = open_table(&report.fragments[0], "physics");
    let names: Vec<&str> = out.schema().names().collect();
    assert_eq!(names, vec!["RunNumber", "el_pt"]);
    assert_eq!(out.load_entry(4).unwrap()[0], Value::Int(102));
}

#[test]
fn planned_basket_sizes_reach_the_output() {
    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());

    // A tiny budget forces several baskets per column
    let report = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 64))
        .merge(&inputs, writer_in(dir.path()))
        .unwrap();

    let out = open_table(&report.fragments[0], "physics");
    for branch in &report.plan.branches {
        let spec = out.schema().column(&branch.name).unwrap();
        assert_eq!(spec.basket_size, branch.basket_size);
        assert_eq!(spec.basket_size % 8, 0);
    }
    let run_total = report.plan.get("RunNumber").unwrap().total_bytes;
    assert_eq!(run_total, 5 * Value::Int(0).stored_bytes());
}

#[test]
fn grl_on_input_without_lumi_column_is_fatal() {
    let dir = tempdir().unwrap();
    let schema = TableSchema::new(vec![ColumnSpec::new("RunNumber", ColumnKind::Int)]);
    let input = MemoryTable::new("physics", schema, vec![vec![Value::Int(100)]]);

    let options = MergeOptions::new(ColumnSelection::All, 1 << 20)
        .with_grl(GoodRunList::new(vec![LumiRange::new(100, 1, 1)]));
    let mut merger = TreeMerger::new(options);
    let err = merger.merge(&[input], writer_in(dir.path())).unwrap_err();

    assert!(matches!(err, MergeError::MissingGrlColumn { ref column, .. } if column == "lbn"));
    assert_eq!(merger.state(), MergeState::Failed);
}

#[test]
fn grl_column_names_are_configurable() {
    let dir = tempdir().unwrap();
    let schema = TableSchema::new(vec![
        ColumnSpec::new("run", ColumnKind::Int),
        ColumnSpec::new("lb", ColumnKind::Int),
    ]);
    let rows = vec![
        vec![Value::Int(7), Value::Int(1)],
        vec![Value::Int(7), Value::Int(9)],
    ];
    let input = MemoryTable::new("physics", schema, rows);
    let options = MergeOptions::new(ColumnSelection::All, 1 << 20)
        .with_grl(GoodRunList::new(vec![LumiRange::new(7, 1, 2)]))
        .with_grl_columns("run", "lb");

    let report = TreeMerger::new(options)
        .merge(&[input], writer_in(dir.path()))
        .unwrap();
    assert_eq!(report.rows_copied, 1);
}

#[test]
fn row_read_failure_aborts_and_leaves_unfinalized_output() {
    use crate::logging::init_for_tests;
    init_for_tests();

    let dir = tempdir().unwrap();
    let factory = TableFactory::events("physics", &[(100, 1), (100, 2), (100, 3)]);
    let rows: Vec<Row> = (0..3)
        .map(|i| {
            vec![
                Value::Int(100),
                Value::Int(i + 1),
                Value::Int(i),
                Value::FloatList(vec![1.0]),
            ]
        })
        .collect();
    let input = MemoryTable::new("physics", factory.schema(), rows).failing_at(1);

    let mut merger = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 1 << 20));
    let err = merger.merge(&[input], writer_in(dir.path())).unwrap_err();

    assert!(matches!(err, MergeError::RowRead(TableError::RowRead { entry: 1, .. })));
    assert_eq!(merger.state(), MergeState::Failed);
    let residue = TableFile::open(dir.path().join("merged.root")).unwrap();
    assert!(matches!(residue.table("physics"), Err(TableError::Unfinalized(_))));
}

#[test]
fn missing_column_in_later_input_is_filled_with_defaults() {
    let dir = tempdir().unwrap();
    let first = TableFactory::events("physics", &[(100, 1)]).create_in(dir.path(), "a");
    let second = TableFactory::new("physics")
        .with_column("RunNumber", ColumnKind::Int)
        .with_column("lbn", ColumnKind::Int)
        .with_row(vec![Value::Int(200), Value::Int(4)])
        .create_in(dir.path(), "b");
    let inputs = vec![open_table(&first, "physics"), open_table(&second, "physics")];

    let columns = vec!["RunNumber".to_string(), "el_pt".to_string()];
    let totals = branch_totals(&inputs, &columns);
    assert_eq!(totals["el_pt"], inputs[0].column_total_bytes("el_pt").unwrap());

    let report = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 1 << 20))
        .merge(&inputs, writer_in(dir.path()))
        .unwrap();
    assert_eq!(report.rows_copied, 2);

    let out = open_table(&report.fragments[0], "physics");
    let row = out.load_entry(1).unwrap();
    assert_eq!(row[0], Value::Int(200));
    assert_eq!(row[3], Value::FloatList(vec![]));
}

#[test]
fn no_inputs_and_empty_selection_are_fatal() {
    let dir = tempdir().unwrap();
    let none: Vec<MemoryTable> = Vec::new();
    let err = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 1))
        .merge(&none, writer_in(dir.path()))
        .unwrap_err();
    assert!(matches!(err, MergeError::NoInputs));

    let inputs = two_inputs(dir.path());
    let selection = ColumnSelection::from_lines(["nothing_here"]);
    let err = TreeMerger::new(MergeOptions::new(selection, 1))
        .merge(&inputs, writer_in(dir.path()))
        .unwrap_err();
    assert!(matches!(err, MergeError::EmptySelection));
}

struct FullDisk {
    schema: TableSchema,
}

impl TableSink for FullDisk {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn set_basket_size(&mut self, _column: &str, _bytes: u64) -> Result<(), TableError> {
        Ok(())
    }

    fn fill(&mut self, _row: &Row) -> Result<(), TableError> {
        Ok(())
    }

    fn write(&mut self) -> Result<u64, TableError> {
        Ok(0)
    }

    fn fragments(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[test]
fn zero_byte_finalize_is_fatal() {
    let dir = tempdir().unwrap();
    let inputs = two_inputs(dir.path());
    let mut merger = TreeMerger::new(MergeOptions::new(ColumnSelection::All, 1 << 20));
    let err = merger
        .merge(&inputs, |schema| Ok(FullDisk { schema }))
        .unwrap_err();

    assert!(matches!(err, MergeError::Finalize(_)));
    assert_eq!(merger.state(), MergeState::Failed);
}
