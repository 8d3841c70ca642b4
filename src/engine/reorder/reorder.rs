use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::engine::errors::ReorderError;
use crate::engine::table::frame::{Frame, write_frame};
use crate::engine::table::{BasketOrder, BasketRecord, TableData, TableFile, TableHeader};
use crate::shared::path::parent_dir;

/// On-disk basket order applied by the reordering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderMode {
    /// Baskets covering the same entries sit next to each other.
    ByEntry,
    /// All baskets of one column are contiguous.
    ByBranch,
}

impl ReorderMode {
    fn sort(&self, baskets: &mut [&BasketRecord]) {
        match self {
            ReorderMode::ByEntry => baskets.sort_by_key(|b| (b.first_entry, b.column)),
            ReorderMode::ByBranch => baskets.sort_by_key(|b| (b.column, b.first_entry)),
        }
    }
}

impl From<ReorderMode> for BasketOrder {
    fn from(mode: ReorderMode) -> Self {
        match mode {
            ReorderMode::ByEntry => BasketOrder::ByEntry,
            ReorderMode::ByBranch => BasketOrder::ByBranch,
        }
    }
}

impl FromStr for ReorderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "by-entry" | "entry" => Ok(ReorderMode::ByEntry),
            "by-branch" | "branch" => Ok(ReorderMode::ByBranch),
            other => Err(format!("unknown reorder mode [{}]", other)),
        }
    }
}

impl fmt::Display for ReorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderMode::ByEntry => write!(f, "by-entry"),
            ReorderMode::ByBranch => write!(f, "by-branch"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderSummary {
    pub reordered: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Reorders `table` in every fragment. A fragment that fails is left as it was.
pub fn reorder<P: AsRef<Path>>(fragments: &[P], table: &str, mode: ReorderMode) -> ReorderSummary {
    let mut summary = ReorderSummary::default();
    for fragment in fragments {
        let path = fragment.as_ref();
        info!(target: "reorder::run", path = %path.display(), %mode, "Reordering baskets");
        match reorder_fragment(path, table, mode) {
            Ok(baskets) => {
                debug!(target: "reorder::run", path = %path.display(), baskets, "Reordered");
                summary.reordered.push(path.to_path_buf());
            }
            Err(e) => {
                warn!(
                    target: "reorder::run",
                    path = %path.display(),
                    error = %e,
                    "Could not reorder fragment, keeping it unchanged"
                );
                summary.failed.push(path.to_path_buf());
            }
        }
    }
    summary
}

/// Rewrites one fragment with the baskets of `table` sorted by `mode`.
/// Returns the number of baskets moved through.
pub fn reorder_fragment(path: &Path, table: &str, mode: ReorderMode) -> Result<usize, ReorderError> {
    let file = TableFile::open(path)?;
    if file.table(table)?.is_none() {
        return Err(ReorderError::NoSuchTable {
            table: table.to_string(),
            path: path.to_path_buf(),
        });
    }

    // Same directory as the fragment so the final rename stays on one device
    let tmp = NamedTempFile::new_in(parent_dir(path))?;
    let mut sorted = 0;
    {
        let mut out = BufWriter::new(tmp.as_file());
        TableHeader::new(mode.into()).write_to(&mut out)?;
        for data in file.raw_tables() {
            let order = if data.name == table { Some(mode) } else { None };
            sorted += write_table(&mut out, data, order)?;
        }
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    drop(file);

    tmp.persist(path).map_err(|e| ReorderError::Persist {
        path: path.to_path_buf(),
        reason: e.error.to_string(),
    })?;
    Ok(sorted)
}

// Writes schema, baskets and footer of one table. Other tables keep their order.
fn write_table<W: Write>(
    out: &mut W,
    data: &TableData,
    order: Option<ReorderMode>,
) -> Result<usize, ReorderError> {
    write_frame(
        out,
        &Frame::Schema {
            table: data.name.clone(),
            columns: data.schema.columns().to_vec(),
        },
    )?;

    let mut baskets: Vec<&BasketRecord> = data.baskets.iter().collect();
    if let Some(mode) = order {
        mode.sort(&mut baskets);
    }
    for basket in &baskets {
        write_frame(
            out,
            &Frame::Basket {
                table: data.name.clone(),
                column: basket.column as u32,
                first_entry: basket.first_entry,
                values: basket.values.clone(),
            },
        )?;
    }

    if let Some(entries) = data.entries {
        write_frame(
            out,
            &Frame::Footer {
                table: data.name.clone(),
                entries,
                column_bytes: data.column_bytes.clone(),
            },
        )?;
    }
    Ok(if order.is_some() { baskets.len() } else { 0 })
}

/// Fragments written for an output base name, `<base>*.root`, sorted.
pub fn fragments_for<P: AsRef<Path>>(output_base: P) -> Result<Vec<PathBuf>, ReorderError> {
    let base = output_base.as_ref().to_string_lossy().into_owned();
    let stem = base.strip_suffix(".root").unwrap_or(&base);
    let pattern = format!("{}*.root", glob::Pattern::escape(stem));
    let mut found = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| ReorderError::Pattern(e.to_string()))? {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => warn!(target: "reorder::fragments", error = %e, "Unreadable fragment path"),
        }
    }
    found.sort();
    Ok(found)
}
