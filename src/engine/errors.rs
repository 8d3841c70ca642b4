use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised by the on-disk table store.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Corrupted table file {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Table [{0}] was never finalized")]
    Unfinalized(String),

    #[error("No such column [{0}]")]
    NoSuchColumn(String),

    #[error("Basket size of [{0}] cannot change after the first row was written")]
    BasketSizeFrozen(String),

    #[error("Row has {got} values, schema has {expected} columns")]
    RowShape { expected: usize, got: usize },

    #[error("Value of kind {got} does not fit column [{column}] of kind {expected}")]
    KindMismatch {
        column: String,
        expected: String,
        got: String,
    },

    #[error("Error loading entry [{entry}] of table [{table}]: {reason}")]
    RowRead {
        table: String,
        entry: u64,
        reason: String,
    },

    #[error("Writer already finalized")]
    Closed,
}

/// Errors raised while loading a good run list.
#[derive(Debug, Error)]
pub enum GrlError {
    #[error("Cannot read GRL file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown GRL file extension ({0})")]
    UnknownExtension(PathBuf),

    #[error("Malformed GRL file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid GRL pattern [{0}]")]
    Pattern(String),
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Cannot read column list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal conditions of a merge session.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Cannot read input list {path}: {source}")]
    InputList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No such file [{path}]: {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("No usable input table")]
    NoInputs,

    #[error("Column selection resolved to no column")]
    EmptySelection,

    #[error("Input table [{table}] has no GRL column [{column}]")]
    MissingGrlColumn { table: String, column: String },

    #[error("GRL column [{column}] holds a non-integer value at entry [{entry}]")]
    GrlColumnType { column: String, entry: u64 },

    #[error("Row read failed: {0}")]
    RowRead(TableError),

    #[error("Output table error: {0}")]
    Output(TableError),

    #[error("File is not optimized! Not enough disk space? ({0})")]
    Finalize(String),
}

impl MergeError {
    pub fn log_error(&self) {
        match self {
            MergeError::RowRead(e) => {
                error!("Row read failed: {}", e);
                debug!("Row read error details: {:?}", e);
            }
            MergeError::Output(e) => {
                error!("Output table error: {}", e);
                debug!("Output table error details: {:?}", e);
            }
            MergeError::Finalize(e) => {
                error!("File is not optimized! Not enough disk space? ({})", e);
            }
            other => {
                error!("{}", other);
                debug!("Merge error details: {:?}", other);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No such table [{table}] in fragment {path}")]
    NoSuchTable { table: String, path: PathBuf },

    #[error("Cannot replace {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("Invalid fragment pattern [{0}]")]
    Pattern(String),
}
