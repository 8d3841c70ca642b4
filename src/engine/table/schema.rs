use serde::{Deserialize, Serialize};

use crate::engine::errors::TableError;
use crate::engine::table::value::{ColumnKind, Value};

/// Basket size a column gets when nobody plans one.
pub const DEFAULT_BASKET_SIZE: u64 = 32_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub basket_size: u64,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            basket_size: DEFAULT_BASKET_SIZE,
        }
    }
}

/// One row, aligned with the columns of a [`TableSchema`].
pub type Row = Vec<Value>;

/// Ordered column list with name lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnSpec> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Subset of this schema with the given names, kept in schema order.
    pub fn project(&self, names: &[String]) -> TableSchema {
        TableSchema {
            columns: self
                .columns
                .iter()
                .filter(|c| names.iter().any(|n| n == &c.name))
                .cloned()
                .collect(),
        }
    }

    pub fn validate_row(&self, row: &Row) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowShape {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        for (spec, value) in self.columns.iter().zip(row) {
            if value.kind() != spec.kind {
                return Err(TableError::KindMismatch {
                    column: spec.name.clone(),
                    expected: spec.kind.to_string(),
                    got: value.kind().to_string(),
                });
            }
        }
        Ok(())
    }
}
