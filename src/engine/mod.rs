pub mod basket;
pub mod errors;
pub mod grl;
pub mod inspect;
pub mod merge;
pub mod reorder;
pub mod table;

pub use errors::*;
