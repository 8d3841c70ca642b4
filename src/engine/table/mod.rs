pub mod frame;
pub mod header;
pub mod schema;
pub mod source;
pub mod table_file;
pub mod table_writer;
pub mod value;

#[cfg(test)]
mod frame_test;

pub use header::{BasketOrder, TableHeader};
pub use schema::{ColumnSpec, DEFAULT_BASKET_SIZE, Row, TableSchema};
pub use source::{TableSink, TableSource};
pub use table_file::{BasketRecord, Table, TableData, TableFile};
pub use table_writer::TableWriter;
pub use value::{ColumnKind, Value};
