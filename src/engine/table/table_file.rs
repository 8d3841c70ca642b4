use indexmap::IndexMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::engine::errors::TableError;
use crate::engine::table::frame::{Frame, read_frame};
use crate::engine::table::header::{BasketOrder, TableHeader};
use crate::engine::table::schema::{Row, TableSchema};
use crate::engine::table::source::TableSource;
use crate::engine::table::value::Value;

/// One basket as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketRecord {
    pub column: usize,
    pub first_entry: u64,
    pub values: Vec<Value>,
}

#[derive(Debug)]
pub struct TableData {
    pub name: String,
    pub schema: TableSchema,
    /// `None` until the footer frame is seen.
    pub entries: Option<u64>,
    pub column_bytes: Vec<u64>,
    /// In on-disk order.
    pub baskets: Vec<BasketRecord>,
    // Per column, basket indices sorted by first entry.
    column_baskets: Vec<Vec<usize>>,
}

impl TableData {
    fn new(name: String, schema: TableSchema) -> Self {
        let ncols = schema.len();
        Self {
            name,
            schema,
            entries: None,
            column_bytes: vec![0; ncols],
            baskets: Vec::new(),
            column_baskets: vec![Vec::new(); ncols],
        }
    }

    fn index_baskets(&mut self) {
        for idx in self.column_baskets.iter_mut() {
            idx.clear();
        }
        for (i, basket) in self.baskets.iter().enumerate() {
            self.column_baskets[basket.column].push(i);
        }
        let baskets = &self.baskets;
        for idx in self.column_baskets.iter_mut() {
            idx.sort_by_key(|&i| baskets[i].first_entry);
        }
    }

    fn value_at(&self, column: usize, entry: u64) -> Option<&Value> {
        let idx = &self.column_baskets[column];
        let pos = idx.partition_point(|&i| self.baskets[i].first_entry <= entry);
        if pos == 0 {
            return None;
        }
        let basket = &self.baskets[idx[pos - 1]];
        basket.values.get((entry - basket.first_entry) as usize)
    }
}

/// An opened table file. Holds every table found in it.
#[derive(Debug)]
pub struct TableFile {
    path: PathBuf,
    order: BasketOrder,
    tables: IndexMap<String, Arc<TableData>>,
}

impl TableFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let header = TableHeader::read_from(&mut reader, &path)?;

        let mut tables: IndexMap<String, TableData> = IndexMap::new();
        while let Some(frame) = read_frame(&mut reader, &path)? {
            let corrupted = |reason: String| TableError::Corrupted {
                path: path.clone(),
                reason,
            };
            match frame {
                Frame::Schema { table, columns } => {
                    if tables.contains_key(&table) {
                        return Err(corrupted(format!("duplicate schema for [{}]", table)));
                    }
                    let data = TableData::new(table.clone(), TableSchema::new(columns));
                    tables.insert(table, data);
                }
                Frame::Basket {
                    table,
                    column,
                    first_entry,
                    values,
                } => {
                    let data = tables
                        .get_mut(&table)
                        .ok_or_else(|| corrupted(format!("basket before schema of [{}]", table)))?;
                    let column = column as usize;
                    if column >= data.schema.len() {
                        return Err(corrupted(format!(
                            "basket for unknown column #{} of [{}]",
                            column, table
                        )));
                    }
                    data.baskets.push(BasketRecord {
                        column,
                        first_entry,
                        values,
                    });
                }
                Frame::Footer {
                    table,
                    entries,
                    column_bytes,
                } => {
                    let data = tables
                        .get_mut(&table)
                        .ok_or_else(|| corrupted(format!("footer before schema of [{}]", table)))?;
                    if column_bytes.len() != data.schema.len() {
                        return Err(corrupted(format!("footer of [{}] has wrong arity", table)));
                    }
                    data.entries = Some(entries);
                    data.column_bytes = column_bytes;
                }
            }
        }

        let tables = tables
            .into_iter()
            .map(|(name, mut data)| {
                data.index_baskets();
                (name, Arc::new(data))
            })
            .collect::<IndexMap<_, _>>();
        debug!(target: "table_file::open", path = %path.display(), tables = tables.len(), "Opened table file");

        Ok(Self {
            path,
            order: header.order,
            tables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn basket_order(&self) -> BasketOrder {
        self.order
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Looks up a table. `Ok(None)` if absent, an error if it was never finalized.
    pub fn table(&self, name: &str) -> Result<Option<Table>, TableError> {
        match self.tables.get(name) {
            None => Ok(None),
            Some(data) if data.entries.is_none() => Err(TableError::Unfinalized(name.to_string())),
            Some(data) => Ok(Some(Table {
                path: self.path.clone(),
                data: Arc::clone(data),
            })),
        }
    }

    /// Raw table data, finalized or not, in file order.
    pub fn raw_tables(&self) -> impl Iterator<Item = &Arc<TableData>> {
        self.tables.values()
    }
}

/// Read handle on one finalized table.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    data: Arc<TableData>,
}

impl Table {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn baskets(&self) -> &[BasketRecord] {
        &self.data.baskets
    }

    /// (column, first entry) of every basket in on-disk order.
    pub fn basket_layout(&self) -> Vec<(usize, u64)> {
        self.data
            .baskets
            .iter()
            .map(|b| (b.column, b.first_entry))
            .collect()
    }
}

impl TableSource for Table {
    fn name(&self) -> &str {
        &self.data.name
    }

    fn schema(&self) -> &TableSchema {
        &self.data.schema
    }

    fn entries(&self) -> u64 {
        self.data.entries.unwrap_or(0)
    }

    fn column_total_bytes(&self, column: &str) -> Option<u64> {
        self.data
            .schema
            .index_of(column)
            .map(|i| self.data.column_bytes[i])
    }

    fn load_entry(&self, entry: u64) -> Result<Row, TableError> {
        let row_error = |reason: String| TableError::RowRead {
            table: self.data.name.clone(),
            entry,
            reason,
        };
        if entry >= self.entries() {
            return Err(row_error(format!("out of range ({} entries)", self.entries())));
        }

        let mut row = Row::with_capacity(self.data.schema.len());
        for (i, spec) in self.data.schema.columns().iter().enumerate() {
            let value = self
                .data
                .value_at(i, entry)
                .ok_or_else(|| row_error(format!("short read on column [{}]", spec.name)))?;
            row.push(value.clone());
        }
        Ok(row)
    }
}
