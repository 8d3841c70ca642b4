use indexmap::IndexMap;
use tracing::{error, info};

use crate::engine::table::{TableSource, Value};

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Columns left out of the comparison.
    pub ignore: Vec<String>,
    /// A difference in one of these stops comparing the entry and fails the diff.
    pub enforce: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore: vec!["Token".to_string()],
            enforce: vec!["BCID".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    pub old_entries: u64,
    pub new_entries: u64,
    pub compared_entries: u64,
    pub columns: Vec<String>,
    pub only_in_old: Vec<String>,
    pub only_in_new: Vec<String>,
    pub identical: u64,
    pub different: u64,
    /// Differing entries per column, enforced columns excluded.
    pub column_differences: IndexMap<String, u64>,
    pub failed: bool,
}

impl DiffReport {
    /// Process exit status of the diff tool: differing entries capped at 255,
    /// never 0 once the comparison failed.
    pub fn exit_code(&self) -> i32 {
        let code = if self.failed {
            self.different.max(1)
        } else {
            self.different
        };
        code.min(255) as i32
    }
}

/// Compares two tables entry by entry over their common columns.
pub fn diff_tables<A, B>(old: &A, new: &B, options: &DiffOptions) -> DiffReport
where
    A: TableSource,
    B: TableSource,
{
    let kept = |name: &&str| !options.ignore.iter().any(|i| i == name);
    let old_columns: Vec<&str> = old.schema().names().filter(kept).collect();
    let new_columns: Vec<&str> = new.schema().names().filter(kept).collect();

    let mut report = DiffReport {
        old_entries: old.entries(),
        new_entries: new.entries(),
        compared_entries: old.entries().min(new.entries()),
        ..Default::default()
    };
    for name in &old_columns {
        if new_columns.contains(name) {
            report.columns.push(name.to_string());
        } else {
            report.only_in_old.push(name.to_string());
        }
    }
    report.only_in_new = new_columns
        .iter()
        .filter(|n| !old_columns.contains(*n))
        .map(|n| n.to_string())
        .collect();

    if report.old_entries != report.new_entries {
        info!(
            target: "diff::tables",
            old = report.old_entries,
            new = report.new_entries,
            "different numbers of entries, comparing [{}] first entries",
            report.compared_entries
        );
    }
    for name in report.only_in_old.iter().chain(&report.only_in_new) {
        info!(target: "diff::tables", "variable [{}] exists in only one tree", name);
    }
    info!(
        target: "diff::tables",
        "comparing [{}] leaves over [{}] entries...",
        report.columns.len(),
        report.compared_entries
    );

    let old_idx: Vec<usize> = index_columns(old, &report.columns);
    let new_idx: Vec<usize> = index_columns(new, &report.columns);

    for entry in 0..report.compared_entries {
        let (old_row, new_row) = match (old.load_entry(entry), new.load_entry(entry)) {
            (Ok(o), Ok(n)) => (o, n),
            (Err(e), _) | (_, Err(e)) => {
                error!(target: "diff::tables", entry, error = %e, "could not load entry");
                report.failed = true;
                break;
            }
        };

        let mut differs = false;
        for (c, name) in report.columns.iter().enumerate() {
            let (o, n) = (&old_row[old_idx[c]], &new_row[new_idx[c]]);
            if o == n {
                continue;
            }
            differs = true;
            let rel = relative_difference(o, n)
                .map(|d| format!("({:.3}%)", d))
                .unwrap_or_else(|| "N/A".to_string());
            info!(target: "diff::tables", "Event #{:4} difference [{}]", entry, name);
            info!(target: "diff::tables", " old: {}", o);
            info!(target: "diff::tables", " new: {}", n);
            info!(target: "diff::tables", " => diff: [{}]", rel);

            if options.enforce.iter().any(|e| e == name) {
                info!(target: "diff::tables", "don't compare further");
                report.failed = true;
                break;
            }
            *report.column_differences.entry(name.clone()).or_insert(0) += 1;
        }

        if differs {
            report.different += 1;
        } else {
            report.identical += 1;
        }
    }

    info!(target: "diff::tables", "Found [{}] identical events", report.identical);
    info!(target: "diff::tables", "Found [{}] different events", report.different);
    for (name, count) in &report.column_differences {
        info!(target: "diff::tables", " [{}]: {} events differ", name, count);
    }
    report
}

/// `50 * (old - new) / (old + new)`, for scalar numbers with a non-zero sum.
pub fn relative_difference(old: &Value, new: &Value) -> Option<f64> {
    let (o, n) = (old.as_f64()?, new.as_f64()?);
    let sum = o + n;
    if sum == 0.0 {
        return None;
    }
    Some(50.0 * (o - n) / sum)
}

fn index_columns<S: TableSource>(table: &S, columns: &[String]) -> Vec<usize> {
    columns
        .iter()
        .filter_map(|c| table.schema().index_of(c))
        .collect()
}
