use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::engine::basket::{BasketAllocator, BasketPlan};
use crate::engine::errors::{MergeError, TableError};
use crate::engine::grl::GoodRunList;
use crate::engine::merge::column_selection::ColumnSelection;
use crate::engine::table::{Row, TableSchema, TableSink, TableSource};

pub const DEFAULT_RUN_COLUMN: &str = "RunNumber";
pub const DEFAULT_LUMI_BLOCK_COLUMN: &str = "lbn";

/// Progress of one merge. Any fatal error moves it to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Init,
    SchemaResolved,
    Allocated,
    Copying,
    Finalized,
    Failed,
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub selection: ColumnSelection,
    pub memory_budget_bytes: u64,
    pub grl: Option<GoodRunList>,
    pub run_column: String,
    pub lumi_block_column: String,
}

impl MergeOptions {
    pub fn new(selection: ColumnSelection, memory_budget_bytes: u64) -> Self {
        Self {
            selection,
            memory_budget_bytes,
            grl: None,
            run_column: DEFAULT_RUN_COLUMN.to_string(),
            lumi_block_column: DEFAULT_LUMI_BLOCK_COLUMN.to_string(),
        }
    }

    pub fn with_grl(mut self, grl: GoodRunList) -> Self {
        self.grl = Some(grl);
        self
    }

    pub fn with_grl_columns(mut self, run_column: &str, lumi_block_column: &str) -> Self {
        self.run_column = run_column.to_string();
        self.lumi_block_column = lumi_block_column.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub rows_seen: u64,
    pub rows_copied: u64,
    pub columns: Vec<String>,
    pub plan: BasketPlan,
    pub bytes_written: u64,
    pub fragments: Vec<PathBuf>,
}

impl MergeReport {
    /// Copied over seen, 0 when nothing was seen.
    pub fn efficiency(&self) -> f64 {
        if self.rows_seen == 0 {
            0.0
        } else {
            self.rows_copied as f64 / self.rows_seen as f64
        }
    }
}

/// Concatenates input tables into one output, with planned basket sizes
/// and optional good-run-list filtering.
pub struct TreeMerger {
    options: MergeOptions,
    state: MergeState,
}

impl TreeMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            state: MergeState::Init,
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    fn transition(&mut self, next: MergeState) {
        debug!(target: "tree_merger::state", from = ?self.state, to = ?next, "State change");
        self.state = next;
    }

    /// Runs the merge. `create_sink` receives the output schema and must
    /// return an empty table; rows are written in input order, then store order.
    pub fn merge<S, K, F>(&mut self, inputs: &[S], create_sink: F) -> Result<MergeReport, MergeError>
    where
        S: TableSource,
        K: TableSink,
        F: FnOnce(TableSchema) -> Result<K, TableError>,
    {
        match self.run(inputs, create_sink) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.transition(MergeState::Failed);
                Err(e)
            }
        }
    }

    fn run<S, K, F>(&mut self, inputs: &[S], create_sink: F) -> Result<MergeReport, MergeError>
    where
        S: TableSource,
        K: TableSink,
        F: FnOnce(TableSchema) -> Result<K, TableError>,
    {
        let first = inputs.first().ok_or(MergeError::NoInputs)?;

        // Step 1: resolve the column selection against the first input
        let columns = self.options.selection.resolve(first.schema());
        if columns.is_empty() {
            return Err(MergeError::EmptySelection);
        }
        info!(target: "tree_merger::run", nleaves = columns.len(), tree = %first.name(), "Resolved columns");
        self.transition(MergeState::SchemaResolved);

        // Step 2: plan basket sizes from the byte totals of every input
        let totals = branch_totals(inputs, &columns);
        let plan = BasketAllocator::new(self.options.memory_budget_bytes).optimize(&totals);
        info!(
            target: "tree_merger::run",
            total_memory_kb = plan.total_memory() as f64 / 1024.0,
            total_baskets = plan.total_baskets(),
            min_basket = plan.min_basket_size().unwrap_or(0),
            max_basket = plan.max_basket_size().unwrap_or(0),
            "Optimized baskets"
        );
        self.transition(MergeState::Allocated);

        // Step 3: create the output and size its baskets before any row
        let mut sink = create_sink(first.schema().project(&columns)).map_err(MergeError::Output)?;
        for branch in &plan.branches {
            sink.set_basket_size(&branch.name, branch.basket_size)
                .map_err(MergeError::Output)?;
        }
        let out_schema = sink.schema().clone();
        self.transition(MergeState::Copying);

        // Step 4: copy rows
        let mut rows_seen = 0u64;
        let mut rows_copied = 0u64;
        info!(target: "tree_merger::run", trees = inputs.len(), "Processing trees...");
        for input in inputs {
            let mapping = column_mapping(input, &out_schema);
            let grl_columns = match &self.options.grl {
                Some(_) => Some(self.grl_columns(input)?),
                None => None,
            };
            info!(target: "tree_merger::run", tree = %input.name(), entries = input.entries(), "Copying entries");

            for entry in 0..input.entries() {
                let row = input.load_entry(entry).map_err(MergeError::RowRead)?;
                rows_seen += 1;

                if let (Some(grl), Some((run_idx, lb_idx))) = (&self.options.grl, grl_columns) {
                    let run = self.grl_value(&row, run_idx, &self.options.run_column, entry)?;
                    let lb = self.grl_value(&row, lb_idx, &self.options.lumi_block_column, entry)?;
                    if !grl.passes(run, lb) {
                        continue;
                    }
                }

                let out: Row = mapping
                    .iter()
                    .zip(out_schema.columns())
                    .map(|(src, spec)| match src {
                        Some(i) => row[*i].clone(),
                        None => spec.kind.default_value(),
                    })
                    .collect();
                sink.fill(&out).map_err(MergeError::Output)?;
                rows_copied += 1;
            }
        }
        info!(target: "tree_merger::run", trees = inputs.len(), "Processing trees... [done]");

        // Step 5: finalize
        let bytes_written = sink
            .write()
            .map_err(|e| MergeError::Finalize(e.to_string()))?;
        if bytes_written == 0 {
            return Err(MergeError::Finalize("nothing was written".into()));
        }
        self.transition(MergeState::Finalized);

        let report = MergeReport {
            rows_seen,
            rows_copied,
            columns,
            plan,
            bytes_written,
            fragments: sink.fragments(),
        };
        info!(
            target: "tree_merger::run",
            "filter efficiency: {}/{} -> {}",
            report.rows_copied,
            report.rows_seen,
            report.efficiency()
        );
        Ok(report)
    }

    fn grl_columns<S: TableSource>(&self, input: &S) -> Result<(usize, usize), MergeError> {
        let lookup = |column: &str| {
            input
                .schema()
                .index_of(column)
                .ok_or_else(|| MergeError::MissingGrlColumn {
                    table: input.name().to_string(),
                    column: column.to_string(),
                })
        };
        Ok((
            lookup(&self.options.run_column)?,
            lookup(&self.options.lumi_block_column)?,
        ))
    }

    fn grl_value(&self, row: &Row, idx: usize, column: &str, entry: u64) -> Result<i64, MergeError> {
        row[idx].as_i64().ok_or_else(|| MergeError::GrlColumnType {
            column: column.to_string(),
            entry,
        })
    }
}

/// Stored bytes of each selected column, summed over all inputs.
/// A column missing from an input contributes nothing.
pub fn branch_totals<S: TableSource>(inputs: &[S], columns: &[String]) -> IndexMap<String, u64> {
    let mut totals: IndexMap<String, u64> = columns.iter().map(|c| (c.clone(), 0)).collect();
    for input in inputs {
        for (column, total) in totals.iter_mut() {
            match input.column_total_bytes(column) {
                Some(bytes) => *total += bytes,
                None => warn!(
                    target: "tree_merger::totals",
                    "tree [{}] has no branch [{}]",
                    input.name(),
                    column
                ),
            }
        }
    }
    totals
}

// Position of every output column in `input`, `None` where the input lacks it.
fn column_mapping<S: TableSource>(input: &S, out_schema: &TableSchema) -> Vec<Option<usize>> {
    out_schema
        .columns()
        .iter()
        .map(|spec| {
            let idx = input.schema().index_of(&spec.name);
            if idx.is_none() {
                warn!(
                    target: "tree_merger::run",
                    "tree [{}] has no branch [{}], filling defaults",
                    input.name(),
                    spec.name
                );
            }
            idx
        })
        .collect()
}
