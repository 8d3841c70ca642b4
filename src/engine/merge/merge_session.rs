use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::errors::{MergeError, TableError};
use crate::engine::merge::tree_merger::{MergeOptions, MergeReport, TreeMerger};
use crate::engine::table::{Table, TableFile, TableSchema, TableSink};

/// Owns every input opened for one merge. Dropping the session releases them.
pub struct MergeSession {
    tree_name: String,
    files: Vec<TableFile>,
    tables: Vec<Table>,
}

impl MergeSession {
    /// Opens every file named in `input_list` (one path per line).
    pub fn open<P: AsRef<Path>>(input_list: P, tree_name: &str) -> Result<Self, MergeError> {
        let paths = read_input_list(input_list.as_ref())?;
        Self::from_paths(&paths, tree_name)
    }

    /// An unreadable file is fatal; a file without the tree is skipped.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], tree_name: &str) -> Result<Self, MergeError> {
        let mut session = Self {
            tree_name: tree_name.to_string(),
            files: Vec::with_capacity(paths.len()),
            tables: Vec::new(),
        };

        for path in paths {
            let path = path.as_ref();
            let open_error = |source: TableError| MergeError::OpenInput {
                path: path.to_path_buf(),
                source,
            };
            let file = TableFile::open(path).map_err(open_error)?;
            info!(target: "merge_session::open", path = %path.display(), "loaded");

            match file.table(tree_name).map_err(open_error)? {
                Some(table) => session.tables.push(table),
                None => warn!(
                    target: "merge_session::open",
                    "no such tree [{}] in file [{}] (IGNORING!)",
                    tree_name,
                    path.display()
                ),
            }
            session.files.push(file);
        }

        Ok(session)
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn opened_files(&self) -> usize {
        self.files.len()
    }

    pub fn usable_inputs(&self) -> usize {
        self.tables.len()
    }

    pub fn merge<K, F>(&self, options: MergeOptions, create_sink: F) -> Result<MergeReport, MergeError>
    where
        K: TableSink,
        F: FnOnce(TableSchema) -> Result<K, TableError>,
    {
        TreeMerger::new(options).merge(&self.tables, create_sink)
    }
}

/// Reads the input list, skipping blank lines.
pub fn read_input_list(path: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let content = fs::read_to_string(path).map_err(|source| MergeError::InputList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect())
}
