pub mod loader;
pub mod lumi_range;


pub use loader::expand_grl_sources;
pub use lumi_range::{GoodRunList, LumiRange, passes};
