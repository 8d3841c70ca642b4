pub mod column_selection;
pub mod merge_session;
pub mod tree_merger;

#[cfg(test)]
mod merge_session_test;
#[cfg(test)]
mod tree_merger_test;

pub use column_selection::ColumnSelection;
pub use merge_session::{MergeSession, read_input_list};
pub use tree_merger::{
    DEFAULT_LUMI_BLOCK_COLUMN, DEFAULT_RUN_COLUMN, MergeOptions, MergeReport, MergeState,
    TreeMerger, branch_totals,
};
