pub mod global;
pub mod model;

#[cfg(test)]
mod model_test;

pub use global::CONFIG;
pub use model::{LoggingConfig, MergeConfig, Settings, load_settings};
