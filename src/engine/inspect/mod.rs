pub mod diff;
pub mod dump;


pub use diff::{DiffOptions, DiffReport, diff_tables, relative_difference};
pub use dump::{EntryRange, dump_table};
