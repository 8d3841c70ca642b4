use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::engine::errors::TableError;
use crate::engine::table::frame::{Frame, write_frame};
use crate::engine::table::schema::{Row, TableSchema};
use crate::engine::table::source::TableSink;
use crate::engine::table::header::{BasketOrder, TableHeader};
use crate::engine::table::value::Value;
use crate::shared::path::fragment_path;

#[derive(Debug, Default)]
struct PendingBasket {
    first_entry: u64,
    values: Vec<Value>,
    bytes: u64,
}

struct Fragment {
    out: BufWriter<File>,
    bytes: u64,
    entries: u64,
    column_bytes: Vec<u64>,
    schema_written: bool,
}

/// Writes one table, splitting it into size-capped fragments.
pub struct TableWriter {
    base: PathBuf,
    table: String,
    schema: TableSchema,
    max_fragment_bytes: u64,
    fragments: Vec<PathBuf>,
    current: Option<Fragment>,
    pending: Vec<PendingBasket>,
    rows_written: u64,
    total_bytes: u64,
}

impl TableWriter {
    pub fn create<P: AsRef<Path>>(
        base: P,
        table: &str,
        schema: TableSchema,
        max_fragment_bytes: u64,
    ) -> Result<Self, TableError> {
        let mut writer = Self {
            base: base.as_ref().to_path_buf(),
            table: table.to_string(),
            pending: (0..schema.len()).map(|_| PendingBasket::default()).collect(),
            schema,
            max_fragment_bytes,
            fragments: Vec::new(),
            current: None,
            rows_written: 0,
            total_bytes: 0,
        };
        writer.open_fragment()?;
        Ok(writer)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn open_fragment(&mut self) -> Result<(), TableError> {
        let path = fragment_path(&self.base, self.fragments.len());
        let mut out = BufWriter::new(File::create(&path)?);
        let header_len = TableHeader::new(BasketOrder::Filled).write_to(&mut out)?;
        debug!(target: "table_writer::fragment", path = %path.display(), "Opened fragment");
        self.fragments.push(path);
        self.total_bytes += header_len;
        self.current = Some(Fragment {
            out,
            bytes: header_len,
            entries: 0,
            column_bytes: vec![0; self.schema.len()],
            schema_written: false,
        });
        Ok(())
    }

    fn emit(&mut self, frame: &Frame) -> Result<(), TableError> {
        let fragment = self.current.as_mut().ok_or(TableError::Closed)?;
        let n = write_frame(&mut fragment.out, frame)?;
        fragment.bytes += n;
        self.total_bytes += n;
        Ok(())
    }

    fn ensure_schema(&mut self) -> Result<(), TableError> {
        let written = self
            .current
            .as_ref()
            .ok_or(TableError::Closed)?
            .schema_written;
        if !written {
            let frame = Frame::Schema {
                table: self.table.clone(),
                columns: self.schema.columns().to_vec(),
            };
            self.emit(&frame)?;
            if let Some(fragment) = self.current.as_mut() {
                fragment.schema_written = true;
            }
        }
        Ok(())
    }

    fn flush_basket(&mut self, column: usize) -> Result<(), TableError> {
        if self.pending[column].values.is_empty() {
            return Ok(());
        }
        let basket = std::mem::take(&mut self.pending[column]);
        self.pending[column].first_entry = basket.first_entry + basket.values.len() as u64;
        let frame = Frame::Basket {
            table: self.table.clone(),
            column: column as u32,
            first_entry: basket.first_entry,
            values: basket.values,
        };
        self.emit(&frame)
    }

    fn finish_fragment(&mut self) -> Result<(), TableError> {
        self.ensure_schema()?;
        for column in 0..self.pending.len() {
            self.flush_basket(column)?;
        }
        let fragment = self.current.as_ref().ok_or(TableError::Closed)?;
        let footer = Frame::Footer {
            table: self.table.clone(),
            entries: fragment.entries,
            column_bytes: fragment.column_bytes.clone(),
        };
        self.emit(&footer)?;

        let mut fragment = self.current.take().ok_or(TableError::Closed)?;
        fragment.out.flush()?;
        fragment.out.get_ref().sync_data()?;
        info!(
            target: "table_writer::fragment",
            table = %self.table,
            entries = fragment.entries,
            bytes = fragment.bytes,
            "Finalized fragment"
        );
        Ok(())
    }

    fn pending_bytes(&self) -> u64 {
        self.pending.iter().map(|p| p.bytes).sum()
    }
}

impl TableSink for TableWriter {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn set_basket_size(&mut self, column: &str, bytes: u64) -> Result<(), TableError> {
        if self.rows_written > 0 {
            return Err(TableError::BasketSizeFrozen(column.to_string()));
        }
        let spec = self
            .schema
            .column_mut(column)
            .ok_or_else(|| TableError::NoSuchColumn(column.to_string()))?;
        spec.basket_size = bytes;
        Ok(())
    }

    fn fill(&mut self, row: &Row) -> Result<(), TableError> {
        let fragment = self.current.as_ref().ok_or(TableError::Closed)?;
        self.schema.validate_row(row)?;

        if fragment.entries > 0 && fragment.bytes + self.pending_bytes() >= self.max_fragment_bytes
        {
            self.finish_fragment()?;
            self.open_fragment()?;
            for pending in self.pending.iter_mut() {
                pending.first_entry = 0;
            }
        }
        self.ensure_schema()?;

        for (column, value) in row.iter().enumerate() {
            let size = value.stored_bytes();
            let pending = &mut self.pending[column];
            pending.values.push(value.clone());
            pending.bytes += size;
            if let Some(fragment) = self.current.as_mut() {
                fragment.column_bytes[column] += size;
            }
            if self.pending[column].bytes >= self.schema.columns()[column].basket_size {
                self.flush_basket(column)?;
            }
        }

        if let Some(fragment) = self.current.as_mut() {
            fragment.entries += 1;
        }
        self.rows_written += 1;
        Ok(())
    }

    fn write(&mut self) -> Result<u64, TableError> {
        self.finish_fragment()?;
        Ok(self.total_bytes)
    }

    fn fragments(&self) -> Vec<PathBuf> {
        self.fragments.clone()
    }
}
