use crate::engine::errors::TableError;
use crate::engine::table::{Row, TableSchema, TableSource};

/// In-memory table, optionally failing to load one entry.
pub struct MemoryTable {
    name: String,
    schema: TableSchema,
    rows: Vec<Row>,
    fail_at: Option<u64>,
}

impl MemoryTable {
    pub fn new(name: &str, schema: TableSchema, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows,
            fail_at: None,
        }
    }

    pub fn failing_at(mut self, entry: u64) -> Self {
        self.fail_at = Some(entry);
        self
    }
}

impl TableSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn entries(&self) -> u64 {
        self.rows.len() as u64
    }

    fn column_total_bytes(&self, column: &str) -> Option<u64> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(|r| r[idx].stored_bytes()).sum())
    }

    fn load_entry(&self, entry: u64) -> Result<Row, TableError> {
        if self.fail_at == Some(entry) {
            return Err(TableError::RowRead {
                table: self.name.clone(),
                entry,
                reason: "got (0) bytes".into(),
            });
        }
        self.rows
            .get(entry as usize)
            .cloned()
            .ok_or_else(|| TableError::RowRead {
                table: self.name.clone(),
                entry,
                reason: "out of range".into(),
            })
    }
}
