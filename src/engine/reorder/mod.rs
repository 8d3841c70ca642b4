pub mod reorder;


pub use reorder::{ReorderMode, ReorderSummary, fragments_for, reorder, reorder_fragment};
