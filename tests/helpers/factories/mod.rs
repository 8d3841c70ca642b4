pub mod grl_factory;
pub mod memory_table;
pub mod table_factory;

pub use grl_factory::GrlFactory;
pub use memory_table::MemoryTable;
pub use table_factory::TableFactory;
