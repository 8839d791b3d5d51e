//! Locates and loads the upgrade configuration.
//!
//! Reads TOML at `~/.config/unitdeploy/config.toml` (`%APPDATA%` on Windows)
//! unless `--config` points elsewhere. A missing file means defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use unitdeploy_upgrade::UpgradeConfig;

pub fn load(explicit: Option<&Path>) -> anyhow::Result<UpgradeConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_file_path(),
    };

    let config = UpgradeConfig::load(&path)
        .with_context(|| format!("cannot load configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

pub fn config_file_path() -> PathBuf {
    config_base_dir().join("unitdeploy").join("config.toml")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
