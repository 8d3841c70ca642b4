use crate::shared::config::model::load_settings_from;
use std::fs;
use tempfile::tempdir;

#[test]
fn defaults_apply_without_config_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent");
    let settings = load_settings_from(missing.to_str().unwrap()).unwrap();

    assert_eq!(settings.merge.memory_budget_kib, 30 * 1024);
    assert_eq!(settings.merge.memory_budget_bytes(), 30 * 1024 * 1024);
    assert_eq!(settings.merge.max_fragment_mib, 1800);
    assert_eq!(settings.merge.max_fragment_bytes(), 1800 * 1024 * 1024);
    assert_eq!(settings.merge.reorder_mode, "by-entry");
    assert_eq!(settings.merge.run_column, "RunNumber");
    assert_eq!(settings.merge.lumi_block_column, "lbn");
    assert_eq!(settings.logging.stdout_level, "info");
    assert!(settings.logging.log_dir.is_empty());
}

#[test]
fn toml_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("merge.toml");
    fs::write(
        &path,
        "[merge]\nmemory_budget_kib = 64\nreorder_mode = \"by-branch\"\n\n[logging]\nstdout_level = \"warn\"\n",
    )
    .unwrap();

    let settings = load_settings_from(path.to_str().unwrap()).unwrap();
    assert_eq!(settings.merge.memory_budget_bytes(), 64 * 1024);
    assert_eq!(settings.merge.reorder_mode, "by-branch");
    assert_eq!(settings.merge.max_fragment_mib, 1800);
    assert_eq!(settings.logging.stdout_level, "warn");
    assert_eq!(settings.logging.file_level, "debug");
}
