use std::path::{Path, PathBuf};

use crate::engine::table::{
    ColumnKind, ColumnSpec, Row, TableSchema, TableSink, TableWriter, Value,
};

pub struct TableFactory {
    table: String,
    columns: Vec<ColumnSpec>,
    rows: Vec<Row>,
    basket_size: Option<u64>,
}

impl TableFactory {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            basket_size: None,
        }
    }

    /// `RunNumber`, `lbn`, `EventNumber` and `el_pt` columns, one row per (run, lbn).
    pub fn events(table: &str, events: &[(i64, i64)]) -> Self {
        let mut factory = Self::new(table)
            .with_column("RunNumber", ColumnKind::Int)
            .with_column("lbn", ColumnKind::Int)
            .with_column("EventNumber", ColumnKind::Int)
            .with_column("el_pt", ColumnKind::FloatList);
        for (i, (run, lbn)) in events.iter().enumerate() {
            factory = factory.with_row(vec![
                Value::Int(*run),
                Value::Int(*lbn),
                Value::Int(run * 1000 + i as i64),
                Value::FloatList(vec![10_000.0 + i as f64]),
            ]);
        }
        factory
    }

    pub fn with_column(mut self, name: &str, kind: ColumnKind) -> Self {
        self.columns.push(ColumnSpec::new(name, kind));
        self
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_basket_size(mut self, bytes: u64) -> Self {
        self.basket_size = Some(bytes);
        self
    }

    pub fn schema(&self) -> TableSchema {
        TableSchema::new(self.columns.clone())
    }

    /// Writes the table as `<dir>/<stem>.root` and returns that path.
    pub fn create_in(&self, dir: &Path, stem: &str) -> PathBuf {
        let mut writer =
            TableWriter::create(dir.join(stem), &self.table, self.schema(), u64::MAX).unwrap();
        if let Some(bytes) = self.basket_size {
            for column in &self.columns {
                writer.set_basket_size(&column.name, bytes).unwrap();
            }
        }
        for row in &self.rows {
            writer.fill(row).unwrap();
        }
        writer.write().unwrap();
        writer.fragments().remove(0)
    }
}
