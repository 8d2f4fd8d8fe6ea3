//! Location of the per-user config file.
//!
//! - `$USAGE_SYNC_CONFIG_DIR/config.json` when the override is set
//! - `<platform config dir>/usage-sync/config.json` otherwise

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "usage-sync";
const CONFIG_FILENAME: &str = "config.json";

/// Environment override for the config directory.
pub const CONFIG_DIR_ENV: &str = "USAGE_SYNC_CONFIG_DIR";

/// Returns the directory that holds `config.json`. Does not create it.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(base.join(APP_DIR))
}

/// Returns the full path of the session config file.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/usage-sync-test-config");
        let dir = config_dir().unwrap();
        let file = config_file().unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(dir, PathBuf::from("/tmp/usage-sync-test-config"));
        assert_eq!(file, dir.join("config.json"));
    }

    #[test]
    #[serial]
    fn test_empty_override_falls_back_to_platform_dir() {
        std::env::set_var(CONFIG_DIR_ENV, "");
        let dir = config_dir();
        std::env::remove_var(CONFIG_DIR_ENV);

        if let Ok(dir) = dir {
            assert!(dir.ends_with(APP_DIR));
        }
    }
}
