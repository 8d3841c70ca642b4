use glob::Pattern;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::errors::SelectionError;
use crate::engine::table::TableSchema;

/// Which columns of the first input end up in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    All,
    /// Exact column names and shell-style patterns, in listing order.
    Entries(Vec<String>),
}

impl ColumnSelection {
    /// One entry per line; blank lines are ignored.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        ColumnSelection::Entries(entries)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SelectionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SelectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(target: "merge::selection", path = %path.display(), "Keeping only the listed branches");
        Ok(Self::from_lines(content.lines()))
    }

    /// Resolves the selection against `schema`, returning names in schema order.
    /// An exact column name wins over reading the entry as a pattern.
    pub fn resolve(&self, schema: &TableSchema) -> Vec<String> {
        let entries = match self {
            ColumnSelection::All => return schema.names().map(str::to_string).collect(),
            ColumnSelection::Entries(entries) => entries,
        };

        let mut selected: HashSet<&str> = HashSet::new();
        for entry in entries {
            if entry == "*" {
                info!(target: "merge::selection", "[*]");
                selected.extend(schema.names());
            } else if schema.has_column(entry) {
                info!(target: "merge::selection", "[{}]", entry);
                selected.insert(entry.as_str());
            } else if is_pattern(entry) {
                let pattern = match Pattern::new(entry) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(target: "merge::selection", pattern = %entry, error = %e, "Invalid branch pattern");
                        continue;
                    }
                };
                let mut matched = false;
                for name in schema.names().filter(|n| pattern.matches(n)) {
                    info!(target: "merge::selection", "[{}] (from pattern [{}])", name, entry);
                    selected.insert(name);
                    matched = true;
                }
                if !matched {
                    warn!(target: "merge::selection", "no branch matches pattern [{}]", entry);
                }
            } else {
                warn!(target: "merge::selection", "no such branch [{}]", entry);
            }
        }

        schema
            .names()
            .filter(|n| selected.contains(n))
            .map(str::to_string)
            .collect()
    }
}

fn is_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}
