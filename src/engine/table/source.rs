use std::path::PathBuf;

use crate::engine::errors::TableError;
use crate::engine::table::schema::{Row, TableSchema};

/// Read side of a columnar table: row-iterable, with per-column byte totals.
pub trait TableSource {
    fn name(&self) -> &str;

    fn schema(&self) -> &TableSchema;

    fn entries(&self) -> u64;

    /// Stored bytes of one column, `None` when the table has no such column.
    fn column_total_bytes(&self, column: &str) -> Option<u64>;

    /// Loads one row. A short or failed read is an error.
    fn load_entry(&self, entry: u64) -> Result<Row, TableError>;
}

/// Write side of a columnar table.
pub trait TableSink {
    fn schema(&self) -> &TableSchema;

    /// Only allowed before the first row is written.
    fn set_basket_size(&mut self, column: &str, bytes: u64) -> Result<(), TableError>;

    fn fill(&mut self, row: &Row) -> Result<(), TableError>;

    /// Flushes everything and returns the number of bytes written.
    fn write(&mut self) -> Result<u64, TableError>;

    /// Files produced so far.
    fn fragments(&self) -> Vec<PathBuf>;
}
