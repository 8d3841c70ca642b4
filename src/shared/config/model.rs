use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub merge: MergeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct MergeConfig {
    /// Memory budget shared by all output baskets, in KiB
    pub memory_budget_kib: u64,
    /// Maximum size of one output fragment, in MiB
    pub max_fragment_mib: u64,
    /// Post-merge basket layout: "by-entry", "by-branch" or "none"
    pub reorder_mode: String,
    pub run_column: String,
    pub lumi_block_column: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Empty disables the file layer
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

impl MergeConfig {
    pub fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_kib * 1024
    }

    pub fn max_fragment_bytes(&self) -> u64 {
        self.max_fragment_mib * 1024 * 1024
    }
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("D3PD_CONFIG").unwrap_or_else(|_| "config".to_string());
    load_settings_from(&config_path)
}

pub fn load_settings_from(config_path: &str) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .set_default("merge.memory_budget_kib", 30 * 1024)?
        .set_default("merge.max_fragment_mib", 1800)?
        .set_default("merge.reorder_mode", "by-entry")?
        .set_default("merge.run_column", "RunNumber")?
        .set_default("merge.lumi_block_column", "lbn")?
        .set_default("logging.log_dir", "")?
        .set_default("logging.stdout_level", "info")?
        .set_default("logging.file_level", "debug")?
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(config::Environment::with_prefix("D3PD").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
