use crate::error::{ConfigContext, Result};
use crate::types::{AutoReconError, Config};
use crate::utils::expand_home;
use log::debug;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

pub const RECON_PATH_ENV: &str = "AUTORECON_RECON_PATH";
pub const HARVESTER_PATH_ENV: &str = "AUTORECON_HARVESTER_PATH";

/// Loads the settings store. A missing store is fatal: every later stage
/// needs the install paths it carries.
pub fn load_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        return Err(AutoReconError::ConfigNotFound(config_path.to_path_buf()));
    }

    let contents = fs::read_to_string(config_path)
        .config_context(|| format!("Failed to read {}", config_path.display()))?;
    let mut config: Config = toml::from_str(&contents)
        .config_context(|| format!("Failed to parse {}", config_path.display()))?;

    apply_env_overrides(&mut config);
    config.recon.path = expand_home(&config.recon.path);
    config.harvester.path = expand_home(&config.harvester.path);
    validate_config(&config)?;

    debug!(
        "Loaded configuration from {} ({} API keys)",
        config_path.display(),
        config.api_keys.len()
    );
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(path) = env::var(RECON_PATH_ENV) {
        config.recon.path = PathBuf::from(path);
    }
    if let Ok(path) = env::var(HARVESTER_PATH_ENV) {
        config.harvester.path = PathBuf::from(path);
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.recon.path.as_os_str().is_empty() {
        return Err(AutoReconError::ConfigError(
            "recon-ng.path must not be empty".to_string(),
        ));
    }
    if config.harvester.path.as_os_str().is_empty() {
        return Err(AutoReconError::ConfigError(
            "theharvester.path must not be empty".to_string(),
        ));
    }
    if config.recon.timeout == 0 {
        return Err(AutoReconError::ConfigError(
            "recon-ng.timeout must be greater than 0".to_string(),
        ));
    }
    if config.pipeline.modules.is_empty() {
        return Err(AutoReconError::ConfigError(
            "pipeline.modules must list at least one module".to_string(),
        ));
    }
    Ok(())
}

/// Rewrites only the `[api_keys]` table of the stored file. Other sections,
/// comments and formatting are kept as they were on disk.
pub fn save_api_keys(config_path: &Path, keys: &BTreeMap<String, String>) -> Result<()> {
    let contents = fs::read_to_string(config_path)
        .config_context(|| format!("Failed to read {}", config_path.display()))?;
    let mut doc: DocumentMut = contents
        .parse()
        .config_context(|| format!("Failed to parse {}", config_path.display()))?;

    let table = doc
        .entry("api_keys")
        .or_insert(toml_edit::table())
        .as_table_mut()
        .ok_or_else(|| {
            AutoReconError::ConfigError(format!(
                "api_keys in {} is not a table",
                config_path.display()
            ))
        })?;
    table.retain(|name, _| keys.contains_key(name));
    for (name, value) in keys {
        table[name.as_str()] = toml_edit::value(value.as_str());
    }

    fs::write(config_path, doc.to_string())
        .config_context(|| format!("Failed to write {}", config_path.display()))?;

    debug!("Wrote {} API keys to {}", keys.len(), config_path.display());
    Ok(())
}
